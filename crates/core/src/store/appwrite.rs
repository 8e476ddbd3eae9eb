use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::SearchCountStore;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::types::{NewSearchCount, SearchCountRecord};

/// Appwrite Databases REST backend for one database/collection pair.
#[derive(Clone)]
pub struct AppwriteStore {
    http: reqwest::Client,
    config: StoreConfig,
}

#[derive(Deserialize)]
struct DocumentList {
    #[serde(default)]
    total: u64,
    documents: Vec<SearchCountRecord>,
}

#[derive(Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

impl AppwriteStore {
    pub fn new(http: reqwest::Client, config: StoreConfig) -> Self {
        Self { http, config }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.config.endpoint, self.config.database_id, self.config.collection_id
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("X-Appwrite-Project", &self.config.project_id)
            .header(CONTENT_TYPE, "application/json");
        match &self.config.api_key {
            Some(key) => builder.header("X-Appwrite-Key", key),
            None => builder,
        }
    }

    async fn list(&self, queries: &[String]) -> Result<Vec<SearchCountRecord>, StoreError> {
        let params: Vec<(&str, &str)> = queries.iter().map(|q| ("queries[]", q.as_str())).collect();
        let response = self
            .request(Method::GET, self.documents_url())
            .query(&params)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let list: DocumentList = decode(response).await?;
        debug!(total = list.total, returned = list.documents.len(), "Listed search counts");
        Ok(list.documents)
    }
}

impl SearchCountStore for AppwriteStore {
    async fn find_by_term(&self, term: &str) -> Result<Option<SearchCountRecord>, StoreError> {
        let queries = [query_equal("searchTerm", term), query_limit(1)];
        Ok(self.list(&queries).await?.into_iter().next())
    }

    async fn create(&self, record: NewSearchCount) -> Result<SearchCountRecord, StoreError> {
        let body = json!({
            "documentId": unique_id(),
            "data": record,
        });
        let response = self
            .request(Method::POST, self.documents_url())
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        decode(response).await
    }

    async fn update_count(&self, id: &str, count: u64) -> Result<SearchCountRecord, StoreError> {
        let url = format!("{}/{}", self.documents_url(), id);
        let response = self
            .request(Method::PATCH, url)
            .json(&json!({ "data": { "count": count } }))
            .send()
            .await
            .map_err(StoreError::Transport)?;
        decode(response).await
    }

    async fn top_by_count(&self, limit: usize) -> Result<Vec<SearchCountRecord>, StoreError> {
        let queries = [query_limit(limit), query_order_desc("count")];
        self.list(&queries).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AppwriteErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        return Err(StoreError::Status { status, message });
    }
    response.json().await.map_err(StoreError::Decode)
}

/// Client-side document id, like the SDK's `ID.unique()`.
fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn query_equal(attribute: &str, value: &str) -> String {
    json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
}

fn query_limit(limit: usize) -> String {
    json!({ "method": "limit", "values": [limit] }).to_string()
}

fn query_order_desc(attribute: &str) -> String {
    json!({ "method": "orderDesc", "attribute": attribute }).to_string()
}
