//! cinescope: debounced movie search with search-popularity tracking.
//!
//! This crate holds everything below the presentation layer: the catalog
//! client, the search-count store, the debouncer, and the session state
//! machine that ties them together.
//!
//! # Modules
//!
//! - [`types`]: Catalog and store records shared across the workspace
//! - [`config`]: Defaults, `.cinescope.toml`, and environment overrides
//! - [`error`]: Typed errors for catalog, store, and config
//! - [`debounce`]: Generation-based input debouncer
//! - [`catalog`]: TMDB search/discover client
//! - [`store`]: Search-count document store (Appwrite or in-memory)
//! - [`counts`]: Search-count upsert and trending reads
//! - [`session`]: View state, events, and the fetch pipeline

pub mod catalog;
pub mod config;
pub mod counts;
pub mod debounce;
pub mod error;
pub mod session;
pub mod store;
pub mod types;

pub use catalog::CatalogClient;
pub use config::{Config, Settings};
pub use session::{Session, SessionEvent, ViewState};
pub use store::{MemoryStore, SearchCountStore, StoreBackend};

/// Open the store selected by `config`, or an in-memory one when none is configured.
pub fn open_store(config: &Config, http: reqwest::Client) -> StoreBackend {
    match &config.store {
        Some(store) => {
            tracing::info!(
                endpoint = store.endpoint.as_str(),
                database = store.database_id.as_str(),
                collection = store.collection_id.as_str(),
                "Using Appwrite search-count store"
            );
            StoreBackend::Appwrite(store::AppwriteStore::new(http, store.clone()))
        }
        None => {
            tracing::info!("No Appwrite store configured, search counts are kept in memory");
            StoreBackend::Memory(MemoryStore::new())
        }
    }
}
