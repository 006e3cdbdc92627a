//! In-memory [`PageStore`] used by tests and the command-line tool.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    ChunkId, ChunkRecord, DocumentId, NewPage, PageId, PageRecord, PageStore, StorageError,
};

#[derive(Default)]
struct Tables {
    pages: BTreeMap<PageId, PageRecord>,
    /// `(document_id, page_number)` -> page id.
    page_index: BTreeMap<(DocumentId, u32), PageId>,
    /// page id -> chunks ordered by `chunk_index`.
    chunks: BTreeMap<PageId, Vec<ChunkRecord>>,
    next_page_id: PageId,
    next_chunk_id: ChunkId,
}

/// Page and chunk tables behind a single `RwLock`.
///
/// Identifiers are assigned sequentially starting at 1, mirroring an auto-increment key.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables
            .read()
            .map_err(|_| StorageError::Backend("page table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables
            .write()
            .map_err(|_| StorageError::Backend("page table lock poisoned".into()))
    }
}

#[async_trait]
impl PageStore for InMemoryStore {
    async fn get_page(&self, page_id: PageId) -> Result<Option<PageRecord>, StorageError> {
        Ok(self.read()?.pages.get(&page_id).cloned())
    }

    async fn find_page(
        &self,
        document_id: DocumentId,
        page_number: u32,
    ) -> Result<Option<PageRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .page_index
            .get(&(document_id, page_number))
            .and_then(|id| tables.pages.get(id))
            .cloned())
    }

    async fn list_chunks(
        &self,
        document_ids: &[DocumentId],
    ) -> Result<Vec<ChunkRecord>, StorageError> {
        let tables = self.read()?;
        let mut wanted: Vec<DocumentId> = document_ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let mut listed = Vec::new();
        for document_id in wanted {
            let pages = tables
                .page_index
                .range((document_id, 0)..=(document_id, u32::MAX))
                .map(|(_, page_id)| page_id);
            for page_id in pages {
                if let Some(chunks) = tables.chunks.get(page_id) {
                    listed.extend(chunks.iter().cloned());
                }
            }
        }
        Ok(listed)
    }

    async fn create_page(&self, page: NewPage) -> Result<PageRecord, StorageError> {
        let mut tables = self.write()?;
        let key = (page.document_id, page.page_number);
        if tables.page_index.contains_key(&key) {
            return Err(StorageError::Conflict {
                document_id: page.document_id,
                page_number: page.page_number,
            });
        }

        tables.next_page_id += 1;
        let record = PageRecord {
            id: tables.next_page_id,
            document_id: page.document_id,
            page_number: page.page_number,
            raw_text: page.raw_text,
            norm_text: page.norm_text,
            width: page.width,
            height: page.height,
            rotation: page.rotation,
        };
        tables.page_index.insert(key, record.id);
        tables.pages.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_chunks(
        &self,
        page_id: PageId,
        texts: Vec<String>,
    ) -> Result<Vec<ChunkRecord>, StorageError> {
        let mut tables = self.write()?;
        let (document_id, page_number) = match tables.pages.get(&page_id) {
            Some(page) => (page.document_id, page.page_number),
            None => {
                return Err(StorageError::NotFound {
                    entity: "page",
                    id: page_id,
                });
            }
        };

        let first_index = tables.chunks.get(&page_id).map_or(0, Vec::len) as u32;
        let mut created = Vec::with_capacity(texts.len());
        for (offset, text) in texts.into_iter().enumerate() {
            tables.next_chunk_id += 1;
            created.push(ChunkRecord {
                id: tables.next_chunk_id,
                page_id,
                document_id,
                page_number,
                chunk_index: first_index + offset as u32,
                text,
            });
        }
        tables
            .chunks
            .entry(page_id)
            .or_default()
            .extend(created.iter().cloned());
        Ok(created)
    }
}
