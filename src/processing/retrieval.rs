//! Keyword-frequency chunk ranking.
//!
//! A chunk's score is the sum, over every keyword extracted from the question, of the number
//! of non-overlapping occurrences of that keyword inside the lowercased chunk text. This is
//! substring counting, so `cell` also counts inside `cells`. Chunks scoring zero are left out
//! of the ranking; if fewer than `top_n` chunks score, the result is padded with unscored
//! chunks in storage order.

use serde::Serialize;

use super::{keywords::extract_keywords, types::RetrievalError};
use crate::store::{ChunkRecord, DocumentId, PageStore};

/// Number of chunks handed to generation when no override is configured.
pub const DEFAULT_TOP_N: usize = 5;

/// A retrieved chunk and the keyword score that selected it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    /// The chunk as listed by storage.
    #[serde(flatten)]
    pub chunk: ChunkRecord,
    /// Keyword occurrence count; `0` for padding.
    pub score: usize,
}

/// Counters describing how a retrieval was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RetrievalStats {
    /// Chunks considered.
    pub candidates: usize,
    /// Keywords extracted from the question, duplicates included.
    pub keywords: usize,
    /// Chunks with a positive score.
    pub scored: usize,
    /// Chunks appended without a score to reach `top_n`.
    pub padded: usize,
}

/// Result of ranking a document set against a question.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Retrieval {
    /// Chunks ordered by descending relevance, padding last.
    pub chunks: Vec<RetrievedChunk>,
    /// Assembly counters.
    pub stats: RetrievalStats,
}

/// Score a chunk against a keyword list.
///
/// Iterates the raw keyword list, so a keyword repeated in the question counts once per
/// repetition.
pub fn score_chunk(text: &str, keywords: &[String]) -> usize {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .map(|keyword| lowered.matches(keyword.as_str()).count())
        .sum()
}

/// Rank `chunks` (in storage order) against `keywords` and keep `top_n`.
///
/// Without keywords the first `top_n` chunks are returned in storage order. Equal scores keep
/// their storage order.
pub fn rank_chunks(chunks: Vec<ChunkRecord>, keywords: &[String], top_n: usize) -> Retrieval {
    let mut stats = RetrievalStats {
        candidates: chunks.len(),
        keywords: keywords.len(),
        ..RetrievalStats::default()
    };

    if keywords.is_empty() {
        let selected: Vec<RetrievedChunk> = chunks
            .into_iter()
            .take(top_n)
            .map(|chunk| RetrievedChunk { chunk, score: 0 })
            .collect();
        stats.padded = selected.len();
        return Retrieval {
            chunks: selected,
            stats,
        };
    }

    let scores: Vec<usize> = chunks
        .iter()
        .map(|chunk| score_chunk(&chunk.text, keywords))
        .collect();

    let mut ranked: Vec<usize> = (0..chunks.len()).filter(|&i| scores[i] > 0).collect();
    stats.scored = ranked.len();
    // `sort_by` is stable, which keeps storage order among equal scores.
    ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]));
    ranked.truncate(top_n);

    if ranked.len() < top_n {
        let mut taken = vec![false; chunks.len()];
        for &index in &ranked {
            taken[index] = true;
        }
        let missing = top_n - ranked.len();
        let padding: Vec<usize> = (0..chunks.len())
            .filter(|&index| !taken[index])
            .take(missing)
            .collect();
        stats.padded = padding.len();
        ranked.extend(padding);
    }

    let mut slots: Vec<Option<ChunkRecord>> = chunks.into_iter().map(Some).collect();
    let selected = ranked
        .into_iter()
        .filter_map(|index| {
            slots[index].take().map(|chunk| RetrievedChunk {
                chunk,
                score: scores[index],
            })
        })
        .collect();

    Retrieval {
        chunks: selected,
        stats,
    }
}

/// Retrieve the `top_n` most relevant chunks of `document_ids` for `question`.
///
/// An empty document set or a set with no chunks yields an empty retrieval, not an error.
pub async fn retrieve_top_chunks<S>(
    store: &S,
    document_ids: &[DocumentId],
    question: &str,
    top_n: usize,
) -> Result<Retrieval, RetrievalError>
where
    S: PageStore + ?Sized,
{
    if document_ids.is_empty() {
        tracing::warn!("No document ids provided for retrieval");
        return Ok(Retrieval::default());
    }

    let chunks = store.list_chunks(document_ids).await?;
    if chunks.is_empty() {
        return Ok(Retrieval::default());
    }

    let keywords = extract_keywords(question);
    if keywords.is_empty() {
        tracing::warn!("No keywords extracted from question; returning leading chunks");
    } else {
        tracing::debug!(keywords = ?keywords, "Scoring chunks");
    }

    let retrieval = rank_chunks(chunks, &keywords, top_n);
    tracing::info!(
        documents = ?document_ids,
        returned = retrieval.chunks.len(),
        scored = retrieval.stats.scored,
        padded = retrieval.stats.padded,
        "Retrieved chunks"
    );
    Ok(retrieval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: i64, text: &str) -> ChunkRecord {
        ChunkRecord {
            id,
            page_id: 1,
            document_id: 1,
            page_number: 1,
            chunk_index: id as u32,
            text: text.to_string(),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    fn ids(retrieval: &Retrieval) -> Vec<i64> {
        retrieval.chunks.iter().map(|hit| hit.chunk.id).collect()
    }

    #[test]
    fn score_counts_case_insensitive_substrings() {
        let kws = keywords(&["cell"]);
        assert_eq!(score_chunk("Cells divide. The CELL wall.", &kws), 2);
        assert_eq!(score_chunk("no match here", &kws), 0);
    }

    #[test]
    fn score_counts_non_overlapping_occurrences() {
        assert_eq!(score_chunk("aaaa", &keywords(&["aa"])), 2);
    }

    #[test]
    fn extra_occurrence_raises_score() {
        let kws = keywords(&["entropy"]);
        let a = score_chunk("Entropy measures disorder.", &kws);
        let b = score_chunk("Entropy measures disorder. Entropy grows.", &kws);
        assert!(b > a);
    }

    #[test]
    fn duplicate_keywords_multiply_weight() {
        let once = score_chunk("entropy", &keywords(&["entropy"]));
        let twice = score_chunk("entropy", &keywords(&["entropy", "entropy"]));
        assert_eq!(once, 1);
        assert_eq!(twice, 2);
    }

    #[test]
    fn ranks_by_descending_score_with_stable_ties() {
        let chunks = vec![
            chunk(1, "heat"),
            chunk(2, "heat heat"),
            chunk(3, "nothing"),
            chunk(4, "heat"),
        ];
        let retrieval = rank_chunks(chunks, &keywords(&["heat"]), 3);
        assert_eq!(ids(&retrieval), vec![2, 1, 4]);
        assert_eq!(retrieval.stats.scored, 3);
        assert_eq!(retrieval.stats.padded, 0);
    }

    #[test]
    fn pads_with_unscored_chunks_in_storage_order() {
        let chunks: Vec<ChunkRecord> = (1..=10)
            .map(|id| {
                let text = match id {
                    4 => "photosynthesis happens",
                    7 => "photosynthesis and photosynthesis",
                    _ => "unrelated",
                };
                chunk(id, text)
            })
            .collect();
        let retrieval = rank_chunks(chunks, &keywords(&["photosynthesis"]), 5);
        assert_eq!(ids(&retrieval), vec![7, 4, 1, 2, 3]);
        assert_eq!(retrieval.stats.padded, 3);

        let mut unique = ids(&retrieval);
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn padding_stops_when_source_is_exhausted() {
        let chunks = vec![chunk(1, "alpha"), chunk(2, "beta")];
        let retrieval = rank_chunks(chunks, &keywords(&["beta"]), 5);
        assert_eq!(ids(&retrieval), vec![2, 1]);
    }

    #[test]
    fn no_keywords_returns_leading_chunks() {
        let chunks = vec![chunk(1, "a"), chunk(2, "b"), chunk(3, "c")];
        let retrieval = rank_chunks(chunks, &[], 2);
        assert_eq!(ids(&retrieval), vec![1, 2]);
        assert!(retrieval.chunks.iter().all(|hit| hit.score == 0));
    }

    #[tokio::test]
    async fn empty_document_set_returns_nothing() {
        let store = crate::store::InMemoryStore::new();
        let retrieval = retrieve_top_chunks(&store, &[], "anything", 5)
            .await
            .unwrap();
        assert!(retrieval.chunks.is_empty());
        let retrieval = retrieve_top_chunks(&store, &[1], "anything", 5)
            .await
            .unwrap();
        assert!(retrieval.chunks.is_empty());
    }
}
