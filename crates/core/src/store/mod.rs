//! Search-count document store.
//!
//! The upsert routine only needs four operations: filtered lookup, create,
//! partial update of `count`, and an ordered, limited listing. [`AppwriteStore`]
//! talks to a hosted Appwrite database; [`MemoryStore`] keeps records for the
//! life of the process.

mod appwrite;
mod memory;

use std::future::Future;

pub use appwrite::AppwriteStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{NewSearchCount, SearchCountRecord};

pub trait SearchCountStore: Send + Sync {
    /// First record whose `searchTerm` equals `term`.
    fn find_by_term(
        &self,
        term: &str,
    ) -> impl Future<Output = Result<Option<SearchCountRecord>, StoreError>> + Send;

    fn create(
        &self,
        record: NewSearchCount,
    ) -> impl Future<Output = Result<SearchCountRecord, StoreError>> + Send;

    /// Overwrite `count` on an existing record.
    fn update_count(
        &self,
        id: &str,
        count: u64,
    ) -> impl Future<Output = Result<SearchCountRecord, StoreError>> + Send;

    /// Up to `limit` records, highest `count` first.
    fn top_by_count(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchCountRecord>, StoreError>> + Send;
}

/// The store chosen at startup.
pub enum StoreBackend {
    Appwrite(AppwriteStore),
    Memory(MemoryStore),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Appwrite(_) => "appwrite",
            StoreBackend::Memory(_) => "memory",
        }
    }
}

impl SearchCountStore for StoreBackend {
    async fn find_by_term(&self, term: &str) -> Result<Option<SearchCountRecord>, StoreError> {
        match self {
            StoreBackend::Appwrite(s) => s.find_by_term(term).await,
            StoreBackend::Memory(s) => s.find_by_term(term).await,
        }
    }

    async fn create(&self, record: NewSearchCount) -> Result<SearchCountRecord, StoreError> {
        match self {
            StoreBackend::Appwrite(s) => s.create(record).await,
            StoreBackend::Memory(s) => s.create(record).await,
        }
    }

    async fn update_count(&self, id: &str, count: u64) -> Result<SearchCountRecord, StoreError> {
        match self {
            StoreBackend::Appwrite(s) => s.update_count(id, count).await,
            StoreBackend::Memory(s) => s.update_count(id, count).await,
        }
    }

    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchCountRecord>, StoreError> {
        match self {
            StoreBackend::Appwrite(s) => s.top_by_count(limit).await,
            StoreBackend::Memory(s) => s.top_by_count(limit).await,
        }
    }
}
