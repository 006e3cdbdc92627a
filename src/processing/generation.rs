//! Boundary with the generative model: context rendering in, response validation out.

use serde_json::Value;

use super::types::{GeneratedClaim, GenerationOutput};
use crate::store::ChunkRecord;

/// Answer used when the model returns nothing usable.
pub const EMPTY_RESPONSE_ANSWER: &str = "The AI returned an empty response. Please try again.";
/// Answer used when the response object has no `answer` key.
pub const MISSING_ANSWER: &str = "Error: Response missing 'answer' field";
/// Warning attached when the response is not valid JSON.
pub const INVALID_JSON_WARNING: &str = "Response was not valid JSON, showing raw text";
/// Warning attached when the response JSON is not an object.
pub const NON_OBJECT_WARNING: &str = "Response JSON root must be an object";

const DEFAULT_PAGE_HINT: i64 = 1;

/// Render chunks as model context, inserting a `[Page N]` marker whenever the page changes.
///
/// Parts are joined with newlines and each marker is preceded by a blank line.
pub fn build_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a ChunkRecord>,
{
    let mut parts: Vec<String> = Vec::new();
    let mut current_page = None;
    for chunk in chunks {
        if current_page != Some(chunk.page_number) {
            parts.push(format!("\n[Page {}]", chunk.page_number));
            current_page = Some(chunk.page_number);
        }
        parts.push(chunk.text.clone());
    }
    parts.join("\n")
}

/// Strip Markdown fences and isolate the outermost `{...}` span.
fn clean_response(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => text[open..=close].trim(),
        _ => text,
    }
}

/// Parse a raw model response into a validated [`GenerationOutput`].
///
/// Never fails: unusable input degrades to an answer with no claims and, where relevant, a
/// `parse_warning`.
pub fn parse_generation_response(raw: &str) -> GenerationOutput {
    let cleaned = clean_response(raw);
    if cleaned.is_empty() {
        tracing::warn!("Empty response after cleaning");
        return GenerationOutput {
            answer: EMPTY_RESPONSE_ANSWER.to_string(),
            claims: Vec::new(),
            parse_warning: None,
        };
    }

    let root = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(root)) => root,
        Ok(other) => {
            tracing::error!(
                kind = json_kind(&other),
                "Response JSON root is not an object"
            );
            return fallback(cleaned, NON_OBJECT_WARNING);
        }
        Err(err) => {
            tracing::error!(error = %err, "Response JSON parse error");
            return fallback(cleaned, INVALID_JSON_WARNING);
        }
    };

    let answer = match root.get("answer") {
        None => MISSING_ANSWER.to_string(),
        Some(value) => text_value(value),
    };

    let claims: Vec<GeneratedClaim> = match root.get("claims") {
        Some(Value::Array(items)) => items.iter().filter_map(validate_claim).collect(),
        _ => Vec::new(),
    };

    GenerationOutput {
        answer,
        claims,
        parse_warning: None,
    }
}

fn fallback(cleaned: &str, warning: &str) -> GenerationOutput {
    GenerationOutput {
        answer: cleaned.to_string(),
        claims: Vec::new(),
        parse_warning: Some(warning.to_string()),
    }
}

/// Keep any object carrying both `claim` and `quote_anchor`.
///
/// A `null` field becomes an empty string so the claim is still reported (as unverified)
/// instead of vanishing from the output.
fn validate_claim(item: &Value) -> Option<GeneratedClaim> {
    let object = item.as_object()?;
    let claim = object.get("claim")?;
    let anchor = object.get("quote_anchor")?;
    let page_hint = object
        .get("page_hint")
        .and_then(coerce_page_hint)
        .unwrap_or(DEFAULT_PAGE_HINT);
    Some(GeneratedClaim {
        claim: field_text(claim),
        quote_anchor: field_text(anchor),
        page_hint,
    })
}

/// Integer page hint from a number, boolean or numeric string; fractional numbers truncate.
///
/// Out-of-range values are kept so the claim fails page resolution rather than landing on
/// another page.
fn coerce_page_hint(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn field_text(value: &Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        text_value(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
