//! Snap model-produced quote anchors onto exact page substrings.

use super::{fuzzy::partial_ratio_alignment_chars, normalize};

/// Replace `dirty_anchor` with the exact fragment of `page_text` it most likely quotes.
///
/// Whitespace runs in the anchor are collapsed, then the lowercased anchor is aligned against
/// the lowercased page. When the alignment reaches `threshold`, the matched region is widened
/// to whole words (alphanumeric runs), sliced out of the original-case page text, and
/// trimmed. In every other case, including empty input, `dirty_anchor` comes back unchanged.
pub fn repair_anchor(page_text: &str, dirty_anchor: &str, threshold: f64) -> String {
    if page_text.is_empty() || dirty_anchor.is_empty() {
        return dirty_anchor.to_string();
    }

    let anchor = normalize::fold_chars(&normalize::clean_text(dirty_anchor));
    if anchor.is_empty() {
        return dirty_anchor.to_string();
    }

    let source: Vec<char> = page_text.chars().collect();
    let folded: Vec<char> = source.iter().copied().map(normalize::fold_char).collect();
    let alignment = partial_ratio_alignment_chars(&anchor, &folded);
    if alignment.score < threshold {
        tracing::debug!(
            score = alignment.score,
            threshold,
            "Anchor alignment below threshold; keeping original"
        );
        return dirty_anchor.to_string();
    }

    let mut start = alignment.dest_start;
    let mut end = alignment.dest_end.min(source.len());
    if start >= end {
        return dirty_anchor.to_string();
    }

    while start > 0 && source[start - 1].is_alphanumeric() {
        start -= 1;
    }
    while end < source.len() && source[end].is_alphanumeric() {
        end += 1;
    }

    let repaired: String = source[start..end].iter().collect();
    let repaired = repaired.trim();
    if repaired.is_empty() {
        dirty_anchor.to_string()
    } else {
        repaired.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "In thermodynamics, Entropy is a measure of disorder in a closed system.";

    #[test]
    fn snaps_typo_onto_source_text() {
        let repaired = repair_anchor(PAGE, "entropy is a mesure of   disorder", 85.0);
        assert_eq!(repaired, "Entropy is a measure of disorder");
    }

    #[test]
    fn exact_quote_is_returned_in_source_case() {
        assert_eq!(repair_anchor(PAGE, "CLOSED SYSTEM", 85.0), "closed system");
    }

    #[test]
    fn widens_clipped_words() {
        assert_eq!(
            repair_anchor(PAGE, "ropy is a meas", 85.0),
            "Entropy is a measure"
        );
    }

    #[test]
    fn weak_alignment_keeps_dirty_anchor() {
        let dirty = "quantum chromodynamics of gluons";
        assert_eq!(repair_anchor(PAGE, dirty, 85.0), dirty);
    }

    #[test]
    fn empty_inputs_return_dirty_anchor() {
        assert_eq!(repair_anchor("", "anything", 85.0), "anything");
        assert_eq!(repair_anchor(PAGE, "", 85.0), "");
        assert_eq!(repair_anchor(PAGE, " \n ", 85.0), " \n ");
    }
}
