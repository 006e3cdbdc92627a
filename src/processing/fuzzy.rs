//! Indel-based fuzzy similarity and best-substring alignment.
//!
//! [`ratio`] is the normalized Indel similarity `100 * 2 * LCS / (len1 + len2)`. The longest
//! common subsequence is computed with the bit-parallel recurrence over 64-bit words, so a
//! comparison costs `O(len1 / 64 * len2)`.
//!
//! [`partial_ratio_alignment`] slides the shorter string over the longer one and reports the
//! best-scoring window: first every prefix of the haystack shorter than the needle, then every
//! full-length window, then every suffix. A window is only scored when the character that
//! entered it occurs in the needle. Ties keep the earliest window; a perfect score ends the
//! scan. All offsets are in characters.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// Best-matching region of two strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Alignment {
    /// Similarity in `[0, 100]`.
    pub score: f64,
    /// Start of the matched region in the first argument.
    pub src_start: usize,
    /// End (exclusive) of the matched region in the first argument.
    pub src_end: usize,
    /// Start of the matched region in the second argument.
    pub dest_start: usize,
    /// End (exclusive) of the matched region in the second argument.
    pub dest_end: usize,
}

impl Alignment {
    fn swapped(self) -> Self {
        Self {
            score: self.score,
            src_start: self.dest_start,
            src_end: self.dest_end,
            dest_start: self.src_start,
            dest_end: self.src_end,
        }
    }
}

/// Per-character occurrence bitmasks of a pattern.
struct PatternMatch {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl PatternMatch {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64).max(1);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (index, &ch) in pattern.iter().enumerate() {
            let mask = masks.entry(ch).or_insert_with(|| vec![0; words]);
            mask[index / 64] |= 1 << (index % 64);
        }
        Self {
            len: pattern.len(),
            words,
            masks,
        }
    }

    /// Length of the longest common subsequence of the pattern and `text`.
    fn lcs(&self, text: &[char]) -> usize {
        let mut state = vec![u64::MAX; self.words];
        for ch in text {
            let Some(mask) = self.masks.get(ch) else {
                continue;
            };
            let mut carry = false;
            for (word, &bits) in state.iter_mut().zip(mask) {
                let matched = *word & bits;
                let (sum, overflow_a) = word.overflowing_add(matched);
                let (sum, overflow_b) = sum.overflowing_add(u64::from(carry));
                *word = sum | (*word - matched);
                carry = overflow_a || overflow_b;
            }
        }

        state
            .iter()
            .enumerate()
            .map(|(index, word)| {
                let bits = (self.len - index * 64).min(64);
                let live = if bits == 64 {
                    u64::MAX
                } else {
                    (1u64 << bits) - 1
                };
                bits - (word & live).count_ones() as usize
            })
            .sum()
    }

    fn ratio(&self, text: &[char]) -> f64 {
        indel_ratio(self.lcs(text), self.len + text.len())
    }
}

fn indel_ratio(lcs: usize, total_len: usize) -> f64 {
    if total_len == 0 {
        return 100.0;
    }
    200.0 * lcs as f64 / total_len as f64
}

/// Normalized Indel similarity of two strings in `[0, 100]`.
///
/// Two empty strings are identical and score `100`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    let (pattern, text) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    PatternMatch::new(pattern).ratio(text)
}

/// Best similarity of the shorter string against any region of the longer one.
pub fn partial_ratio(needle: &str, haystack: &str) -> f64 {
    partial_ratio_alignment(needle, haystack).score
}

/// Locate the region of the longer string that best matches the shorter one.
///
/// The `src_*` offsets refer to `needle` and the `dest_*` offsets to `haystack`, even when the
/// needle is the longer of the two.
pub fn partial_ratio_alignment(needle: &str, haystack: &str) -> Alignment {
    let needle: Vec<char> = needle.chars().collect();
    let haystack: Vec<char> = haystack.chars().collect();
    partial_ratio_alignment_chars(&needle, &haystack)
}

pub(crate) fn partial_ratio_alignment_chars(needle: &[char], haystack: &[char]) -> Alignment {
    if needle.is_empty() || haystack.is_empty() {
        let score = if needle.is_empty() && haystack.is_empty() {
            100.0
        } else {
            0.0
        };
        return Alignment {
            score,
            src_start: 0,
            src_end: needle.len(),
            dest_start: 0,
            dest_end: haystack.len(),
        };
    }

    if needle.len() > haystack.len() {
        return scan_windows(haystack, needle).swapped();
    }

    let best = scan_windows(needle, haystack);
    if needle.len() == haystack.len() && best.score < 100.0 {
        let reverse = scan_windows(haystack, needle).swapped();
        if reverse.score > best.score {
            return reverse;
        }
    }
    best
}

/// Exhaustive window scan; `short.len() <= long.len()`, both non-empty.
fn scan_windows(short: &[char], long: &[char]) -> Alignment {
    let len1 = short.len();
    let len2 = long.len();
    let pattern = PatternMatch::new(short);
    let charset: HashSet<char> = short.iter().copied().collect();

    let mut best = Alignment {
        score: 0.0,
        src_start: 0,
        src_end: len1,
        dest_start: 0,
        dest_end: len1,
    };

    let consider = |start: usize, end: usize, best: &mut Alignment| -> bool {
        let score = pattern.ratio(&long[start..end]);
        if score > best.score {
            best.score = score;
            best.dest_start = start;
            best.dest_end = end;
        }
        best.score >= 100.0
    };

    for end in 1..len1 {
        if charset.contains(&long[end - 1]) && consider(0, end, &mut best) {
            return best;
        }
    }

    for start in 0..len2 - len1 {
        if charset.contains(&long[start + len1 - 1])
            && consider(start, start + len1, &mut best)
        {
            return best;
        }
    }

    for start in len2 - len1..len2 {
        if charset.contains(&long[start]) && consider(start, len2, &mut best) {
            return best;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_identical_and_disjoint_strings() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn ratio_counts_insertions_and_deletions() {
        let score = ratio("this is a test", "this is a test!");
        assert!((score - 2800.0 / 29.0).abs() < 1e-9, "score {score}");
    }

    #[test]
    fn ratio_spans_multiple_words() {
        let text: String = "The mitochondria is the powerhouse of the cell. ".repeat(3);
        assert!(text.chars().count() > 128);
        assert_eq!(ratio(&text, &text), 100.0);

        let mut edited: Vec<char> = text.chars().collect();
        edited[100] = '#';
        let edited: String = edited.into_iter().collect();
        let n = text.chars().count() as f64;
        let expected = 200.0 * (n - 1.0) / (2.0 * n);
        assert!((ratio(&text, &edited) - expected).abs() < 1e-9);
    }

    #[test]
    fn exact_substring_scores_perfectly() {
        let alignment = partial_ratio_alignment("cell", "the cell divides");
        assert_eq!(alignment.score, 100.0);
        assert_eq!((alignment.dest_start, alignment.dest_end), (4, 8));
        assert_eq!((alignment.src_start, alignment.src_end), (0, 4));
    }

    #[test]
    fn typo_scores_high_but_not_perfect() {
        let score = partial_ratio(
            "entropy is a mesure",
            "in thermodynamics, entropy is a measure of disorder",
        );
        assert!(score > 90.0 && score < 100.0, "score {score}");
    }

    #[test]
    fn unrelated_text_scores_low() {
        let score = partial_ratio(
            "the moon is made of cheese",
            "the mitochondria is the powerhouse of the cell",
        );
        assert!(score < 85.0, "score {score}");
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(partial_ratio("", ""), 100.0);
        assert_eq!(partial_ratio("", "text"), 0.0);
        assert_eq!(partial_ratio("text", ""), 0.0);
    }

    #[test]
    fn longer_needle_swaps_offsets() {
        let alignment = partial_ratio_alignment("the cell divides", "cell");
        assert_eq!(alignment.score, 100.0);
        assert_eq!((alignment.src_start, alignment.src_end), (4, 8));
        assert_eq!((alignment.dest_start, alignment.dest_end), (0, 4));
    }

    #[test]
    fn earliest_window_wins_ties() {
        let alignment = partial_ratio_alignment("abc", "xabcyabc");
        assert_eq!(alignment.score, 100.0);
        assert_eq!(alignment.dest_start, 1);
    }

    #[test]
    fn partial_match_at_haystack_edges() {
        let alignment = partial_ratio_alignment("ending", "this text has an end");
        assert!(alignment.score > 0.0);
        assert_eq!(alignment.dest_end, 20);
    }

    #[test]
    fn long_needle_uses_multiword_masks() {
        let needle = "Entropy is a measure of molecular disorder in a closed thermodynamic system";
        let haystack = format!("Preamble text. {needle} Trailing remarks follow here.");
        assert!(needle.chars().count() > 64);
        let alignment = partial_ratio_alignment(needle, &haystack);
        assert_eq!(alignment.score, 100.0);
        assert_eq!(alignment.dest_start, 15);
        assert_eq!(alignment.dest_end, 15 + needle.chars().count());
    }
}
