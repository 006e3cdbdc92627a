//! Helpers for normalizing page text and quote anchors.

/// Collapse every whitespace run to a single space and trim both ends.
///
/// Used on extracted page text before it is stored, and on anchors before alignment.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase text for case-insensitive matching.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

/// Lowercase a single character without changing the character count.
///
/// `str::to_lowercase` may expand one character into several (`İ` becomes `i̇`), which would
/// shift every offset after it. Alignment works on character offsets that must map back onto
/// the original text, so only the first lowercase scalar is kept.
pub fn fold_char(ch: char) -> char {
    if ch.is_ascii() {
        ch.to_ascii_lowercase()
    } else {
        ch.to_lowercase().next().unwrap_or(ch)
    }
}

/// Lowercase text one character at a time, preserving character offsets.
pub fn fold_chars(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_and_trims() {
        assert_eq!(
            clean_text("  Entropy\n\tis   a\r\nmeasure  "),
            "Entropy is a measure"
        );
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn normalize_text_lowercases() {
        assert_eq!(normalize_text("The CELL"), "the cell");
    }

    #[test]
    fn fold_chars_keeps_length() {
        let text = "İstanbul Ünİ";
        assert_eq!(fold_chars(text).len(), text.chars().count());
        assert_eq!(fold_chars("ABC").into_iter().collect::<String>(), "abc");
    }
}
