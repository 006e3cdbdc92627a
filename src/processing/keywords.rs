//! Question keyword extraction.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Tokens shorter than this are ignored.
pub const MIN_KEYWORD_LENGTH: usize = 3;

const STOP_WORDS: &str = "\
    the a an is are was were be been being have has had do does did will would could should \
    may might must shall can need dare ought used to of in for on with at by from as into \
    through during before after above below between under again further then once here there \
    when where why how all each few more most other some such no nor not only own same so \
    than too very just and but if or because until while although though what which who whom \
    this that these those am it its i me my myself we our ours ourselves you your yours \
    yourself he him his himself she her hers herself they them their theirs themselves \
";

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.split_whitespace().collect())
}

/// Whether `token` (already lowercase) is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    stop_words().contains(token)
}

/// Extract lowercase keywords from a question.
///
/// Tokens are runs of ASCII letters; digits, punctuation and non-ASCII characters separate
/// tokens. Stop words and tokens shorter than [`MIN_KEYWORD_LENGTH`] are dropped. Order of
/// first appearance is kept and repeated words stay repeated, so a word asked about twice
/// weighs twice during scoring.
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| token.len() >= MIN_KEYWORD_LENGTH)
        .map(|token| token.to_ascii_lowercase())
        .filter(|token| !is_stop_word(token))
        .collect()
}
