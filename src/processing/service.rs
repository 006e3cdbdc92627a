//! Grounding service coordinating ingestion, retrieval, anchor repair and verification.

use crate::{
    config::Config,
    events::{EventSink, PipelineEvent, TracingSink},
    extraction::{ExtractedPage, TextExtractor},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::chunk_text,
        normalize::{clean_text, normalize_text},
        repair::repair_anchor,
        retrieval::{Retrieval, retrieve_top_chunks},
        types::{
            ClaimReport, ClaimSummary, GeneratedClaim, IngestionError, IngestionOutcome,
            RetrievalError, Verification, VerifiedClaim,
        },
        verify::CitationVerifier,
    },
    store::{DocumentId, NewPage, PageRecord, PageStore, StorageError},
};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;

/// Coordinates the grounding pipeline over a storage and an extraction collaborator.
///
/// The service owns long-lived handles to both collaborators, the event sink and the metrics
/// registry so that every surface (the CLI, tests, host applications) reuses the same
/// components. Construct it once and share it through an `Arc`.
pub struct GroundingService {
    store: Arc<dyn PageStore>,
    extractor: Arc<dyn TextExtractor>,
    verifier: CitationVerifier,
    config: Config,
    sink: Arc<dyn EventSink>,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the grounding pipeline used by external surfaces.
#[async_trait]
pub trait GroundingApi: Send + Sync {
    /// Extract, clean, chunk and store every page of a document.
    async fn ingest_document(
        &self,
        document_id: DocumentId,
    ) -> Result<IngestionOutcome, IngestionError>;

    /// Rank the chunks of `document_ids` against `question`.
    async fn retrieve(
        &self,
        document_ids: &[DocumentId],
        question: &str,
    ) -> Result<Retrieval, RetrievalError>;

    /// Repair and verify generated claims against the pages they cite.
    async fn verify_claims(
        &self,
        document_ids: &[DocumentId],
        claims: Vec<GeneratedClaim>,
    ) -> ClaimReport;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl GroundingService {
    /// Build a service from its collaborators and an already loaded configuration.
    pub fn new(
        store: Arc<dyn PageStore>,
        extractor: Arc<dyn TextExtractor>,
        config: Config,
    ) -> Self {
        let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
        let verifier = CitationVerifier::new(store.clone(), extractor.clone())
            .with_threshold(config.fuzzy_threshold)
            .with_search_timeout(config.search_timeout)
            .with_sink(sink.clone());
        Self {
            store,
            extractor,
            verifier,
            config,
            sink,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Route pipeline events to `sink` instead of the default [`TracingSink`].
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.verifier = self.verifier.with_sink(sink.clone());
        self.sink = sink;
        self
    }

    /// Configuration the service was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Citation verifier sharing this service's collaborators and settings.
    pub fn verifier(&self) -> &CitationVerifier {
        &self.verifier
    }

    /// Pull pages for `document_id` from the extractor and ingest them.
    pub async fn ingest_document(
        &self,
        document_id: DocumentId,
    ) -> Result<IngestionOutcome, IngestionError> {
        tracing::info!(document_id, "Processing document");
        let pages = self
            .extractor
            .extract_pages(document_id)
            .await
            .map_err(|source| IngestionError::Extraction {
                document_id,
                source,
            })?;
        Ok(self.ingest_pages(document_id, pages).await)
    }

    /// Store already extracted pages and their chunks.
    ///
    /// A page rejected by storage (a duplicate page number or a backend failure) is logged,
    /// counted in `pages_failed` and skipped; the remaining pages are still ingested.
    pub async fn ingest_pages(
        &self,
        document_id: DocumentId,
        pages: Vec<ExtractedPage>,
    ) -> IngestionOutcome {
        let mut outcome = IngestionOutcome::default();

        for page in pages {
            let raw_text = clean_text(&page.text);
            let norm_text = normalize_text(&raw_text);
            let page_number = page.page_number;
            let stored = match self
                .store
                .create_page(NewPage {
                    document_id,
                    page_number,
                    raw_text,
                    norm_text,
                    width: page.width,
                    height: page.height,
                    rotation: 0,
                })
                .await
            {
                Ok(stored) => stored,
                Err(err) => {
                    tracing::warn!(
                        document_id,
                        page_number,
                        error = %err,
                        "Error processing page"
                    );
                    self.metrics.record_page_failure();
                    self.sink.emit(&PipelineEvent::PageSkipped {
                        document_id,
                        page_number,
                        reason: err.to_string(),
                    });
                    outcome.pages_failed += 1;
                    continue;
                }
            };
            outcome.pages_processed += 1;

            let chunks = if stored.raw_text.is_empty() {
                Vec::new()
            } else {
                chunk_text(&stored.raw_text, &self.config.chunker)
            };
            let created = if chunks.is_empty() {
                0
            } else {
                match self.store.create_chunks(stored.id, chunks).await {
                    Ok(created) => created.len(),
                    Err(err) => {
                        tracing::warn!(
                            document_id,
                            page_number,
                            error = %err,
                            "Failed to store chunks for page"
                        );
                        0
                    }
                }
            };
            outcome.chunks_created += created;

            self.metrics.record_page(created as u64);
            self.sink.emit(&PipelineEvent::PageIngested {
                document_id,
                page_number,
                chunks: created,
            });
            tracing::debug!(
                document_id,
                page_number,
                chars = stored.raw_text.chars().count(),
                chunks = created,
                "Processed page"
            );
        }

        tracing::info!(
            document_id,
            pages = outcome.pages_processed,
            failed = outcome.pages_failed,
            chunks = outcome.chunks_created,
            "Document processing complete"
        );
        outcome
    }

    /// Rank chunks for a question using the configured `top_n`.
    pub async fn retrieve(
        &self,
        document_ids: &[DocumentId],
        question: &str,
    ) -> Result<Retrieval, RetrievalError> {
        let retrieval = retrieve_top_chunks(
            self.store.as_ref(),
            document_ids,
            question,
            self.config.top_n,
        )
        .await?;
        self.metrics.record_retrieval();
        self.sink.emit(&PipelineEvent::RetrievalCompleted {
            candidates: retrieval.stats.candidates,
            returned: retrieval.chunks.len(),
            padded: retrieval.stats.padded,
        });
        Ok(retrieval)
    }

    /// Repair and verify every claim concurrently; results keep generation order.
    pub async fn verify_claims(
        &self,
        document_ids: &[DocumentId],
        claims: Vec<GeneratedClaim>,
    ) -> ClaimReport {
        let claims: Vec<VerifiedClaim> = join_all(
            claims
                .into_iter()
                .map(|claim| self.verify_claim(document_ids, claim)),
        )
        .await;
        let summary = ClaimSummary::from_claims(&claims);
        tracing::info!(
            claims = claims.len(),
            verified = summary.verified,
            likely = summary.likely,
            unverified = summary.unverified,
            "Analysis complete"
        );
        ClaimReport { claims, summary }
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn verify_claim(
        &self,
        document_ids: &[DocumentId],
        generated: GeneratedClaim,
    ) -> VerifiedClaim {
        let GeneratedClaim {
            claim,
            quote_anchor,
            page_hint,
        } = generated;

        let page = match self.resolve_page(document_ids, page_hint).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                tracing::warn!(
                    page_hint,
                    documents = ?document_ids,
                    "Page not found in any selected document"
                );
                let error = format!("Page {page_hint} not found in any selected document");
                return self.unchecked(claim, quote_anchor, page_hint, error);
            }
            Err(err) => {
                tracing::warn!(page_hint, error = %err, "Page lookup failed");
                return self.unchecked(claim, quote_anchor, page_hint, err.to_string());
            }
        };

        let source = if page.raw_text.is_empty() {
            &page.norm_text
        } else {
            &page.raw_text
        };
        let repaired = repair_anchor(source, &quote_anchor, self.config.fuzzy_threshold);
        if repaired != quote_anchor {
            self.metrics.record_repair();
            self.sink.emit(&PipelineEvent::AnchorRepaired {
                page_id: page.id,
                original: quote_anchor,
                repaired: repaired.clone(),
            });
        }

        let verification = self.verifier.verify_against(&page, &repaired).await;
        self.metrics.record_status(verification.status);

        VerifiedClaim {
            claim,
            quote_anchor: repaired,
            page_hint,
            page_id: Some(page.id),
            document_id: Some(page.document_id),
            verification,
            error: None,
        }
    }

    /// First page numbered `page_hint` across `document_ids`, in the order given.
    async fn resolve_page(
        &self,
        document_ids: &[DocumentId],
        page_hint: i64,
    ) -> Result<Option<PageRecord>, StorageError> {
        let Ok(page_number) = u32::try_from(page_hint) else {
            return Ok(None);
        };
        for &document_id in document_ids {
            if let Some(page) = self.store.find_page(document_id, page_number).await? {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    fn unchecked(
        &self,
        claim: String,
        quote_anchor: String,
        page_hint: i64,
        error: String,
    ) -> VerifiedClaim {
        let verification = Verification::default();
        self.metrics.record_status(verification.status);
        VerifiedClaim {
            claim,
            quote_anchor,
            page_hint,
            page_id: None,
            document_id: None,
            verification,
            error: Some(error),
        }
    }
}

#[async_trait]
impl GroundingApi for GroundingService {
    async fn ingest_document(
        &self,
        document_id: DocumentId,
    ) -> Result<IngestionOutcome, IngestionError> {
        GroundingService::ingest_document(self, document_id).await
    }

    async fn retrieve(
        &self,
        document_ids: &[DocumentId],
        question: &str,
    ) -> Result<Retrieval, RetrievalError> {
        GroundingService::retrieve(self, document_ids, question).await
    }

    async fn verify_claims(
        &self,
        document_ids: &[DocumentId],
        claims: Vec<GeneratedClaim>,
    ) -> ClaimReport {
        GroundingService::verify_claims(self, document_ids, claims).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        GroundingService::metrics_snapshot(self)
    }
}
