use std::sync::atomic::{AtomicU64, Ordering};

use crate::processing::VerificationStatus;

/// Thread-safe counters describing grounding activity.
#[derive(Default)]
pub struct PipelineMetrics {
    pages_ingested: AtomicU64,
    pages_failed: AtomicU64,
    chunks_created: AtomicU64,
    retrievals: AtomicU64,
    verified: AtomicU64,
    likely: AtomicU64,
    unverified: AtomicU64,
    anchors_repaired: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored page and the number of chunks produced for it.
    pub fn record_page(&self, chunk_count: u64) {
        self.pages_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_created
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a page that storage rejected during ingestion.
    pub fn record_page_failure(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed retrieval.
    pub fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a citation classification.
    pub fn record_status(&self, status: VerificationStatus) {
        let counter = match status {
            VerificationStatus::Verified => &self.verified,
            VerificationStatus::Likely => &self.likely,
            VerificationStatus::Unverified => &self.unverified,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an anchor that repair changed.
    pub fn record_repair(&self) {
        self.anchors_repaired.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_ingested: self.pages_ingested.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            chunks_created: self.chunks_created.load(Ordering::Relaxed),
            retrievals: self.retrievals.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
            likely: self.likely.load(Ordering::Relaxed),
            unverified: self.unverified.load(Ordering::Relaxed),
            anchors_repaired: self.anchors_repaired.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Pages stored since startup.
    pub pages_ingested: u64,
    /// Pages skipped because storage rejected them.
    pub pages_failed: u64,
    /// Total chunks stored across all ingested pages.
    pub chunks_created: u64,
    /// Retrievals served.
    pub retrievals: u64,
    /// Citations classified `VERIFIED`.
    pub verified: u64,
    /// Citations classified `LIKELY`.
    pub likely: u64,
    /// Citations classified `UNVERIFIED`.
    pub unverified: u64,
    /// Anchors rewritten by repair before verification.
    pub anchors_repaired: u64,
}
