//! Two-stage citation verification.
//!
//! A quote is first fuzzy-matched against the page's normalized text. Below the threshold it
//! is rejected as `UNVERIFIED` and no coordinates are sought. At or above the threshold the
//! extraction collaborator is asked for exact rectangles: any hit makes the citation
//! `VERIFIED`, no hit leaves it `LIKELY`. Coordinate search failures and timeouts count as
//! "no hit"; they are logged and reported to the event sink, never returned as errors.

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;

use super::{
    fuzzy::partial_ratio,
    normalize::{clean_text, normalize_text},
    types::{CitationCheck, Verification, VerificationError, VerificationStatus},
};
use crate::{
    events::{EventSink, PipelineEvent, TracingSink},
    extraction::{BoundingBox, TextExtractor},
    store::{PageId, PageRecord, PageStore},
};

/// Minimum fuzzy score for a quote to count as present on the page.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 85.0;
/// Upper bound on a single coordinate search.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Classify a citation from its fuzzy score and whether exact rectangles were found.
///
/// A score equal to the threshold passes.
pub fn classify(score: f64, threshold: f64, located: bool) -> VerificationStatus {
    if score < threshold {
        VerificationStatus::Unverified
    } else if located {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Likely
    }
}

/// Verifies quotes against stored pages.
#[derive(Clone)]
pub struct CitationVerifier {
    store: Arc<dyn PageStore>,
    extractor: Arc<dyn TextExtractor>,
    sink: Arc<dyn EventSink>,
    threshold: f64,
    search_timeout: Duration,
}

impl CitationVerifier {
    /// Create a verifier with the default threshold, timeout and a [`TracingSink`].
    pub fn new(store: Arc<dyn PageStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            store,
            extractor,
            sink: Arc::new(TracingSink),
            threshold: DEFAULT_FUZZY_THRESHOLD,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Override the fuzzy-match threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the coordinate search timeout.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Route events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Fuzzy-match threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Verify `anchor` against the page identified by `page_id`.
    ///
    /// An empty or whitespace-only anchor is `UNVERIFIED` with score 0 and never reaches
    /// storage. A missing page yields [`VerificationError::PageNotFound`].
    pub async fn verify_citation(
        &self,
        page_id: PageId,
        anchor: &str,
    ) -> Result<Verification, VerificationError> {
        if anchor.trim().is_empty() {
            tracing::warn!(page_id, "Empty quote anchor provided");
            return Ok(Verification::default());
        }

        let page = self
            .store
            .get_page(page_id)
            .await?
            .ok_or(VerificationError::PageNotFound(page_id))?;
        Ok(self.verify_against(&page, anchor).await)
    }

    /// Verify `anchor` against an already loaded page.
    pub async fn verify_against(&self, page: &PageRecord, anchor: &str) -> Verification {
        if anchor.trim().is_empty() {
            tracing::warn!(page_id = page.id, "Empty quote anchor provided");
            return Verification::default();
        }

        let needle = normalize_text(anchor.trim());
        let score = partial_ratio(&needle, &page.norm_text);
        tracing::debug!(
            page_id = page.id,
            score,
            threshold = self.threshold,
            "Fuzzy match scored"
        );

        let bounding_boxes = if score < self.threshold {
            Vec::new()
        } else {
            self.locate(page, anchor).await
        };
        let status = classify(score, self.threshold, !bounding_boxes.is_empty());

        match status {
            VerificationStatus::Verified => tracing::info!(
                page_id = page.id,
                boxes = bounding_boxes.len(),
                "Citation verified"
            ),
            VerificationStatus::Likely => tracing::info!(
                page_id = page.id,
                score,
                "Citation likely; exact phrase not located"
            ),
            VerificationStatus::Unverified => tracing::info!(
                page_id = page.id,
                score,
                threshold = self.threshold,
                "Citation unverified"
            ),
        }
        self.sink.emit(&PipelineEvent::CitationClassified {
            page_id: page.id,
            status,
            score,
        });

        Verification {
            status,
            score,
            bounding_boxes,
        }
    }

    /// Verify each `(page_id, quote)` pair independently.
    ///
    /// Results follow input order. A pair whose page is missing becomes `UNVERIFIED` with the
    /// error `"Page not found"`; other failures carry the storage error text.
    pub async fn verify_many(&self, citations: &[(PageId, String)]) -> Vec<CitationCheck> {
        join_all(citations.iter().map(|(page_id, quote)| async move {
            match self.verify_citation(*page_id, quote).await {
                Ok(verification) => CitationCheck {
                    page_id: *page_id,
                    quote: quote.clone(),
                    verification,
                    error: None,
                },
                Err(err) => {
                    let error = match err {
                        VerificationError::PageNotFound(_) => "Page not found".to_string(),
                        other => other.to_string(),
                    };
                    tracing::warn!(page_id, %error, "Citation could not be checked");
                    CitationCheck {
                        page_id: *page_id,
                        quote: quote.clone(),
                        verification: Verification::default(),
                        error: Some(error),
                    }
                }
            }
        }))
        .await
    }

    /// Exact search for the original anchor, then for its whitespace-collapsed form.
    async fn locate(&self, page: &PageRecord, anchor: &str) -> Vec<BoundingBox> {
        match self.search(page, anchor).await {
            Some(rects) if !rects.is_empty() => return rects,
            Some(_) => {}
            None => return Vec::new(),
        }

        let collapsed = clean_text(anchor);
        if collapsed == anchor {
            return Vec::new();
        }
        tracing::debug!(
            page_id = page.id,
            "Retrying coordinate search with collapsed whitespace"
        );
        self.search(page, &collapsed).await.unwrap_or_default()
    }

    /// One bounded coordinate search. `None` means the search failed.
    async fn search(&self, page: &PageRecord, phrase: &str) -> Option<Vec<BoundingBox>> {
        let lookup = self
            .extractor
            .search_text(page.document_id, page.page_number, phrase);
        let reason = match tokio::time::timeout(self.search_timeout, lookup).await {
            Ok(Ok(rects)) => return Some(rects),
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!(
                "search timed out after {} ms",
                self.search_timeout.as_millis()
            ),
        };
        tracing::error!(page_id = page.id, %reason, "Error extracting coordinates");
        self.sink.emit(&PipelineEvent::CoordinateSearchFailed {
            page_id: page.id,
            reason,
        });
        None
    }
}
