//! Pipeline event reporting.
//!
//! Ingestion, retrieval and verification report what they did through an [`EventSink`]
//! supplied by the caller. [`TracingSink`] forwards events to `tracing`; [`NoopSink`]
//! discards them. Sinks are called inline on the pipeline's task and must not block.

use serde::Serialize;

use crate::{
    processing::VerificationStatus,
    store::{DocumentId, PageId},
};

/// A single observable step of the grounding pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A page and its chunks were stored.
    PageIngested {
        /// Owning document.
        document_id: DocumentId,
        /// Page number within the document.
        page_number: u32,
        /// Chunks created for the page.
        chunks: usize,
    },
    /// A page could not be stored and was skipped.
    PageSkipped {
        /// Owning document.
        document_id: DocumentId,
        /// Page number within the document.
        page_number: u32,
        /// Storage failure text.
        reason: String,
    },
    /// Chunks were ranked for a question.
    RetrievalCompleted {
        /// Chunks considered.
        candidates: usize,
        /// Chunks returned.
        returned: usize,
        /// Returned chunks that were padding.
        padded: usize,
    },
    /// An anchor was rewritten before verification.
    AnchorRepaired {
        /// Page the anchor was aligned against.
        page_id: PageId,
        /// Anchor as generated.
        original: String,
        /// Anchor after repair.
        repaired: String,
    },
    /// A citation received its final classification.
    CitationClassified {
        /// Page the citation was checked against.
        page_id: PageId,
        /// Final classification.
        status: VerificationStatus,
        /// Fuzzy score in `[0, 100]`.
        score: f64,
    },
    /// Exact coordinate search failed or timed out; treated as no match.
    CoordinateSearchFailed {
        /// Page that was searched.
        page_id: PageId,
        /// Failure text.
        reason: String,
    },
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    /// Handle one event. Called from the pipeline; implementations must be cheap.
    fn emit(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing` at debug level, failures at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PageIngested {
                document_id,
                page_number,
                chunks,
            } => tracing::debug!(document_id, page_number, chunks, "Page ingested"),
            PipelineEvent::PageSkipped {
                document_id,
                page_number,
                reason,
            } => tracing::warn!(document_id, page_number, %reason, "Page skipped"),
            PipelineEvent::RetrievalCompleted {
                candidates,
                returned,
                padded,
            } => tracing::debug!(candidates, returned, padded, "Retrieval completed"),
            PipelineEvent::AnchorRepaired {
                page_id,
                original,
                repaired,
            } => tracing::debug!(page_id, %original, %repaired, "Anchor repaired"),
            PipelineEvent::CitationClassified {
                page_id,
                status,
                score,
            } => tracing::debug!(
                page_id,
                status = status.as_str(),
                score,
                "Citation classified"
            ),
            PipelineEvent::CoordinateSearchFailed { page_id, reason } => {
                tracing::warn!(page_id, %reason, "Coordinate search failed")
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = PipelineEvent::CitationClassified {
            page_id: 3,
            status: VerificationStatus::Likely,
            score: 90.0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "citation_classified");
        assert_eq!(value["status"], "LIKELY");
        assert_eq!(value["page_id"], 3);
    }

    #[test]
    fn sinks_accept_every_event() {
        let event = PipelineEvent::CoordinateSearchFailed {
            page_id: 1,
            reason: "timeout".into(),
        };
        TracingSink.emit(&event);
        NoopSink.emit(&event);
    }
}
