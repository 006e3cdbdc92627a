//! Core data types and error definitions for the grounding pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    extraction::{BoundingBox, ExtractionError},
    store::{DocumentId, PageId, StorageError},
};

/// Errors produced while configuring the chunker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// A zero-sized window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must stay below half the chunk size so every window advances.
    #[error("chunk overlap {overlap} must be less than half of chunk size {chunk_size}")]
    InvalidOverlap {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The extractor could not produce pages for the document.
    #[error("Failed to extract document {document_id}: {source}")]
    Extraction {
        /// Document being ingested.
        document_id: DocumentId,
        /// Underlying extractor failure.
        #[source]
        source: ExtractionError,
    },
}

/// Errors emitted while ranking chunks for a question.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Chunk listing failed.
    #[error("Failed to list chunks: {0}")]
    Storage(#[from] StorageError),
}

/// Errors emitted by single-citation verification.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The cited page does not exist.
    #[error("Page {0} not found")]
    PageNotFound(PageId),
    /// Page lookup failed in the storage backend.
    #[error("Storage request failed: {0}")]
    Storage(#[from] StorageError),
}

/// Trust classification of a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    /// The quote was not found in the cited page; possible hallucination.
    #[default]
    Unverified,
    /// The quote fuzzy-matches the page but could not be located exactly.
    Likely,
    /// The quote fuzzy-matches and has exact coordinates on the page.
    Verified,
}

impl VerificationStatus {
    /// Upper-case label used in logs and serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Likely => "LIKELY",
            Self::Verified => "VERIFIED",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one anchor against one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Verification {
    /// Final classification.
    pub status: VerificationStatus,
    /// Fuzzy partial-match score in `[0, 100]`.
    pub score: f64,
    /// Rectangles of the exact phrase; empty unless `status` is `VERIFIED`.
    #[serde(rename = "bboxes")]
    pub bounding_boxes: Vec<BoundingBox>,
}

/// One entry of a batch verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationCheck {
    /// Page the quote was checked against.
    pub page_id: PageId,
    /// Quote exactly as submitted.
    pub quote: String,
    /// Verification result (`UNVERIFIED` with score 0 when `error` is set).
    #[serde(flatten)]
    pub verification: Verification,
    /// Failure marker such as `"Page not found"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Claim as supplied by the generation step, after boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedClaim {
    /// Statement made by the model.
    pub claim: String,
    /// Verbatim quote the model says supports the statement.
    pub quote_anchor: String,
    /// Page number the model cites, kept as given even when no page could carry it.
    pub page_hint: i64,
}

/// Validated generation output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    /// Answer text shown to the user.
    pub answer: String,
    /// Claims that passed validation, in generation order.
    pub claims: Vec<GeneratedClaim>,
    /// Set when the response could not be parsed as the expected JSON shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_warning: Option<String>,
}

/// A claim merged with its verification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedClaim {
    /// Statement made by the model.
    pub claim: String,
    /// Repaired anchor, or the original one when no page was found.
    pub quote_anchor: String,
    /// Page number the model cited.
    pub page_hint: i64,
    /// Resolved page, if any selected document has `page_hint`.
    pub page_id: Option<PageId>,
    /// Document that owns the resolved page.
    pub document_id: Option<DocumentId>,
    /// Classification, score, and rectangles.
    #[serde(flatten)]
    pub verification: Verification,
    /// Failure marker when the claim could not be checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-status counts over a set of verified claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClaimSummary {
    /// Claims classified `VERIFIED`.
    pub verified: usize,
    /// Claims classified `LIKELY`.
    pub likely: usize,
    /// Claims classified `UNVERIFIED`.
    pub unverified: usize,
}

impl ClaimSummary {
    /// Tally the statuses of `claims`.
    pub fn from_claims(claims: &[VerifiedClaim]) -> Self {
        claims.iter().fold(Self::default(), |mut summary, claim| {
            match claim.verification.status {
                VerificationStatus::Verified => summary.verified += 1,
                VerificationStatus::Likely => summary.likely += 1,
                VerificationStatus::Unverified => summary.unverified += 1,
            }
            summary
        })
    }
}

/// Verified claims plus their status tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimReport {
    /// Claims in generation order.
    pub claims: Vec<VerifiedClaim>,
    /// Status counts.
    pub summary: ClaimSummary,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestionOutcome {
    /// Pages stored successfully.
    pub pages_processed: usize,
    /// Pages skipped because storage rejected them.
    pub pages_failed: usize,
    /// Chunks stored across all processed pages.
    pub chunks_created: usize,
}
