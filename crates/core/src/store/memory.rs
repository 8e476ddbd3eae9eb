use dashmap::DashMap;

use super::SearchCountStore;
use crate::error::StoreError;
use crate::types::{NewSearchCount, SearchCountRecord};

/// Process-local store, keyed by document id.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, SearchCountRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Snapshot of every record, sorted by search term.
    pub fn records(&self) -> Vec<SearchCountRecord> {
        let mut all: Vec<SearchCountRecord> = self.docs.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.search_term.cmp(&b.search_term));
        all
    }
}

impl SearchCountStore for MemoryStore {
    async fn find_by_term(&self, term: &str) -> Result<Option<SearchCountRecord>, StoreError> {
        Ok(self.docs.iter().find(|e| e.value().search_term == term).map(|e| e.value().clone()))
    }

    async fn create(&self, record: NewSearchCount) -> Result<SearchCountRecord, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let doc = SearchCountRecord {
            id: id.clone(),
            search_term: record.search_term,
            count: record.count,
            movie_id: record.movie_id,
            poster_url: record.poster_url,
            title: record.title,
        };
        self.docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update_count(&self, id: &str, count: u64) -> Result<SearchCountRecord, StoreError> {
        let mut doc = self.docs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.count = count;
        Ok(doc.clone())
    }

    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchCountRecord>, StoreError> {
        let mut all: Vec<SearchCountRecord> = self.docs.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.search_term.cmp(&b.search_term)));
        all.truncate(limit);
        Ok(all)
    }
}
