//! TMDB catalog client.
//!
//! A non-empty query hits `/search/movie`; an empty one falls back to the
//! popularity-sorted `/discover/movie` list.

use reqwest::header::ACCEPT;
use reqwest::Url;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::types::CatalogPage;

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    image_base_url: String,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, config: &CatalogConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            api_token: config.api_token.clone(),
            image_base_url: config.image_base_url.clone(),
        }
    }

    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    /// Fetch one page of movies for `query`.
    ///
    /// Logical failures (`"response": "False"`) come back as `Ok`; the caller
    /// decides what to show. Transport, status, and decode problems are errors.
    pub async fn fetch_movies(&self, query: &str) -> Result<CatalogPage, CatalogError> {
        let url = endpoint_url(&self.base_url, query)?;
        debug!(url = %url, "Fetching movies");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(CatalogError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        let page: CatalogPage = response.json().await.map_err(CatalogError::Decode)?;
        debug!(results = page.movies().len(), "Catalog page received");
        Ok(page)
    }
}

/// Build the endpoint for `query`, URL-encoding it.
pub fn endpoint_url(base_url: &str, query: &str) -> Result<Url, CatalogError> {
    let base = base_url.trim_end_matches('/');
    let (path, key, value) = if query.is_empty() {
        ("discover/movie", "sort_by", "popularity.desc")
    } else {
        ("search/movie", "query", query)
    };

    let mut url =
        Url::parse(&format!("{base}/{path}")).map_err(|e| CatalogError::Url(e.to_string()))?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_CATALOG_BASE_URL;

    #[test]
    fn empty_query_uses_discover() {
        let url = endpoint_url(DEFAULT_CATALOG_BASE_URL, "").unwrap();
        assert_eq!(url.path(), "/3/discover/movie");
        assert_eq!(url.query(), Some("sort_by=popularity.desc"));
    }

    #[test]
    fn query_is_encoded_for_search() {
        let url = endpoint_url(DEFAULT_CATALOG_BASE_URL, "fast & furious?").unwrap();
        assert_eq!(url.path(), "/3/search/movie");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("query".to_string(), "fast & furious?".to_string())]);
        assert!(!url.as_str().contains(" & "), "raw query leaked: {url}");
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let url = endpoint_url("http://localhost:8080/3/", "up").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/3/search/movie?query=up");
    }

    #[test]
    fn bad_base_is_reported() {
        assert!(matches!(endpoint_url("not a url", "x"), Err(CatalogError::Url(_))));
    }
}
