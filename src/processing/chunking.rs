//! Overlapping fixed-size chunker that prefers sentence boundaries.
//!
//! Page text is cut into windows of roughly `chunk_size` characters. Each window may end
//! early at the last sentence terminator (`.`, `!`, `?` followed by whitespace) found near
//! its naive end, provided that boundary lies past the window's midpoint. Consecutive
//! windows share `overlap` characters so retrieval sees context across cuts.
//!
//! Highlights:
//!
//! - Offsets count Unicode scalar values, so multi-byte text never splits inside a char.
//! - Text no longer than `chunk_size` is returned unchanged as a single chunk.
//! - When the naive end falls within `tail_slack` characters of the end, the remainder
//!   becomes the last chunk instead of leaving a tiny trailing fragment.
//! - Interior chunks are trimmed; the tail chunk is emitted as-is.

use super::types::ChunkingError;

/// Target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// How far before the naive end the sentence-boundary search begins.
pub const DEFAULT_LOOKBACK: usize = 200;
/// How far past the naive end the sentence-boundary search extends.
pub const DEFAULT_LOOKAHEAD: usize = 50;
/// Distance from the end of text within which the remainder becomes the final chunk.
pub const DEFAULT_TAIL_SLACK: usize = 50;

/// Validated chunker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    overlap: usize,
    lookback: usize,
    lookahead: usize,
    tail_slack: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            lookback: DEFAULT_LOOKBACK,
            lookahead: DEFAULT_LOOKAHEAD,
            tail_slack: DEFAULT_TAIL_SLACK,
        }
    }
}

impl ChunkerConfig {
    /// Build a config with default boundary-search windows.
    ///
    /// Rejects a zero `chunk_size`, and any `overlap` of half the chunk size or more, since
    /// such a window could end up where it started.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        Self::default().resized(chunk_size, overlap)
    }

    /// Replace chunk size and overlap, keeping the boundary window and tail slack.
    pub fn resized(self, chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap.saturating_mul(2) >= chunk_size {
            return Err(ChunkingError::InvalidOverlap {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            ..self
        })
    }

    /// Override the sentence-boundary search window around the naive end.
    pub fn with_boundary_window(mut self, lookback: usize, lookahead: usize) -> Self {
        self.lookback = lookback;
        self.lookahead = lookahead;
        self
    }

    /// Override the tail slack. `0` only stops once the naive end reaches the end of text.
    pub fn with_tail_slack(mut self, tail_slack: usize) -> Self {
        self.tail_slack = tail_slack;
        self
    }

    /// Target chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split `text` into overlapping chunks.
///
/// Pure and deterministic: identical `(text, config)` always yields identical chunks.
/// Returns an empty vector for empty text and `[text]` when it fits in one chunk.
/// Chunks that are whitespace only after trimming are emitted as-is.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    if offsets.len() <= config.chunk_size {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    offsets.push(text.len());

    chunk_spans(&chars, config)
        .into_iter()
        .map(|span| {
            let slice = &text[offsets[span.start]..offsets[span.end]];
            if span.tail {
                slice.to_string()
            } else {
                slice.trim().to_string()
            }
        })
        .collect()
}

/// Character range of one chunk before trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkSpan {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) tail: bool,
}

/// Compute chunk windows over `chars` for text longer than `chunk_size`.
pub(crate) fn chunk_spans(chars: &[char], config: &ChunkerConfig) -> Vec<ChunkSpan> {
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let naive_end = start + config.chunk_size;
        if naive_end + config.tail_slack >= len {
            spans.push(ChunkSpan {
                start,
                end: len,
                tail: true,
            });
            break;
        }

        let search_start = naive_end.saturating_sub(config.lookback).max(start);
        let search_end = (naive_end + config.lookahead).min(len);
        let midpoint = start + config.chunk_size / 2;
        let end = match last_sentence_break(chars, search_start, search_end) {
            Some(boundary) if boundary > midpoint => boundary,
            _ => naive_end,
        };

        spans.push(ChunkSpan {
            start,
            end,
            tail: false,
        });
        start = end - config.overlap;
    }

    spans
}

/// Offset just past the last `[.!?]` + whitespace pair inside `chars[from..to]`.
fn last_sentence_break(chars: &[char], from: usize, to: usize) -> Option<usize> {
    if to < from + 2 {
        return None;
    }
    (from..to - 1)
        .rev()
        .find(|&index| matches!(chars[index], '.' | '!' | '?') && chars[index + 1].is_whitespace())
        .map(|index| index + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize) -> ChunkerConfig {
        ChunkerConfig::new(chunk_size, overlap).expect("valid config")
    }

    fn sentences(count: usize) -> String {
        (0..count)
            .map(|i| format!("Sentence number {i} talks about topic {}.", i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let text = "  Short text, untouched.  ";
        assert_eq!(chunk_text(text, &ChunkerConfig::default()), vec![text]);

        let exact = "x".repeat(DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_text(&exact, &ChunkerConfig::default()), vec![exact]);
    }

    #[test]
    fn prefers_sentence_boundary_past_midpoint() {
        let text = format!("{}. {}", "a".repeat(70), "b".repeat(200));
        let chunks = chunk_text(&text, &config(100, 10));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], format!("{}.", "a".repeat(70)));
        // The only boundary in the second window sits before its midpoint, so the naive end wins.
        assert_eq!(chunks[1].chars().count(), 100);
        assert!(chunks[2].chars().all(|c| c == 'b'));
    }

    #[test]
    fn picks_last_boundary_in_search_region() {
        let text = format!(
            "{}. {}! {}? {}",
            "a".repeat(55),
            "b".repeat(20),
            "c".repeat(20),
            "d".repeat(200)
        );
        let chunks = chunk_text(&text, &config(100, 10));
        assert!(chunks[0].ends_with('?'), "first chunk: {}", chunks[0]);
    }

    #[test]
    fn tail_slack_absorbs_short_remainder() {
        let text = "z".repeat(130);
        assert_eq!(chunk_text(&text, &config(100, 10)), vec![text.clone()]);

        let strict = config(100, 10).with_tail_slack(0);
        let chunks = chunk_text(&text, &strict);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].chars().count(), 40);
    }

    #[test]
    fn spans_cover_text_without_gaps() {
        let text = sentences(200);
        let chars: Vec<char> = text.chars().collect();
        let cfg = config(300, 40);
        let spans = chunk_spans(&chars, &cfg);

        assert!(spans.len() > 2);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans.last().map(|span| span.end), Some(chars.len()));
        assert!(spans.last().is_some_and(|span| span.tail));
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start, "windows must advance");
            assert!(pair[1].start <= pair[0].end, "gap between {pair:?}");
            assert_eq!(pair[0].end - pair[1].start, cfg.overlap());
        }

        let chunks = chunk_text(&text, &cfg);
        assert_eq!(chunks.len(), spans.len());
        for (chunk, span) in chunks.iter().zip(&spans) {
            let slice: String = chars[span.start..span.end].iter().collect();
            if span.tail {
                assert_eq!(chunk, &slice);
            } else {
                assert_eq!(chunk, slice.trim());
            }
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "Əlifba çox gözəldir. ".repeat(40);
        let chunks = chunk_text(&text, &config(120, 20));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(text.contains(chunk.as_str()));
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = sentences(120);
        let cfg = config(250, 30);
        assert_eq!(chunk_text(&text, &cfg), chunk_text(&text, &cfg));
    }

    #[test]
    fn config_rejects_impossible_windows() {
        assert_eq!(
            ChunkerConfig::new(0, 0).unwrap_err(),
            ChunkingError::InvalidChunkSize
        );
        assert_eq!(
            ChunkerConfig::new(100, 50).unwrap_err(),
            ChunkingError::InvalidOverlap {
                overlap: 50,
                chunk_size: 100
            }
        );
        assert!(ChunkerConfig::new(100, 49).is_ok());

        let strict = ChunkerConfig::default().with_tail_slack(0);
        let resized = strict.resized(200, 20).expect("valid resize");
        assert_eq!(resized, config(200, 20).with_tail_slack(0));
        assert_eq!(ChunkerConfig::default().chunk_size(), 1000);
        assert_eq!(ChunkerConfig::default().overlap(), 100);
    }
}
