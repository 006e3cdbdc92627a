//! Storage collaborator for pages and chunks.
//!
//! The grounding pipeline never owns persistence. It reads page text and chunk listings
//! through [`PageStore`], and ingestion writes new pages and chunks through the same trait.
//! Records handed out by a store are immutable snapshots; nothing in the pipeline mutates them.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Identifier of an ingested document.
pub type DocumentId = i64;
/// Identifier of a stored page.
pub type PageId = i64;
/// Identifier of a stored chunk.
pub type ChunkId = i64;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up (`page`, `document`).
        entity: &'static str,
        /// Identifier that failed to resolve.
        id: i64,
    },
    /// A page with the same `(document_id, page_number)` already exists.
    #[error("page {page_number} of document {document_id} already exists")]
    Conflict {
        /// Owning document.
        document_id: DocumentId,
        /// Duplicate 1-indexed page number.
        page_number: u32,
    },
    /// The backend failed for reasons unrelated to the request.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Read-only view of a stored page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// Page identifier.
    pub id: PageId,
    /// Owning document.
    pub document_id: DocumentId,
    /// 1-indexed page number within the document.
    pub page_number: u32,
    /// Cleaned page text with case preserved.
    pub raw_text: String,
    /// Lowercased copy of `raw_text` used for fuzzy matching.
    pub norm_text: String,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270).
    pub rotation: u16,
}

/// Page payload handed to [`PageStore::create_page`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    /// Owning document.
    pub document_id: DocumentId,
    /// 1-indexed page number within the document.
    pub page_number: u32,
    /// Cleaned page text with case preserved.
    pub raw_text: String,
    /// Lowercased page text.
    pub norm_text: String,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Page rotation in degrees.
    pub rotation: u16,
}

/// Read-only view of a stored chunk, with the owning page's coordinates attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkRecord {
    /// Chunk identifier.
    pub id: ChunkId,
    /// Owning page.
    pub page_id: PageId,
    /// Document that owns the page.
    pub document_id: DocumentId,
    /// Page number of the owning page.
    pub page_number: u32,
    /// 0-indexed position of the chunk within its page.
    pub chunk_index: u32,
    /// Chunk text.
    pub text: String,
}

/// Storage operations consumed by ingestion, retrieval, and verification.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_page`](PageStore::get_page) | Page text and geometry by id |
/// | [`find_page`](PageStore::find_page) | Page by document and page number |
/// | [`list_chunks`](PageStore::list_chunks) | Chunks of documents in storage order |
/// | [`create_page`](PageStore::create_page) | Insert a page during ingestion |
/// | [`create_chunks`](PageStore::create_chunks) | Insert the chunks of a page |
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Fetch a page by id. Returns `Ok(None)` when no such page exists.
    async fn get_page(&self, page_id: PageId) -> Result<Option<PageRecord>, StorageError>;

    /// Fetch the page with `page_number` inside `document_id`.
    async fn find_page(
        &self,
        document_id: DocumentId,
        page_number: u32,
    ) -> Result<Option<PageRecord>, StorageError>;

    /// List every chunk whose page belongs to one of `document_ids`.
    ///
    /// Ordering is storage order: document id, then page number, then chunk index.
    async fn list_chunks(
        &self,
        document_ids: &[DocumentId],
    ) -> Result<Vec<ChunkRecord>, StorageError>;

    /// Insert a page. Duplicate `(document_id, page_number)` pairs are rejected.
    async fn create_page(&self, page: NewPage) -> Result<PageRecord, StorageError>;

    /// Insert the chunks of a page, assigning `chunk_index` values `0..n`.
    async fn create_chunks(
        &self,
        page_id: PageId,
        texts: Vec<String>,
    ) -> Result<Vec<ChunkRecord>, StorageError>;
}
