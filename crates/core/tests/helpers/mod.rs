//! Test harness for pipeline integration tests.
//!
//! Starts fake catalog and Appwrite servers on ephemeral ports and builds a
//! session pointed at them. Everything runs in-process over real HTTP.

#![allow(dead_code)]

pub mod appwrite;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use cinescope_core::config::CatalogConfig;
use cinescope_core::session::SessionOptions;
use cinescope_core::{CatalogClient, MemoryStore, Session};

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const TOKEN: &str = "test-token";

/// Bind `app` to 127.0.0.1 on an ephemeral port and serve it in the background.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

// ---------------------------------------------------------------------------
// Fake catalog
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Reply {
    Page(Value),
    Status(StatusCode),
}

/// Canned catalog responses keyed by query ("" is the discover list).
#[derive(Default)]
pub struct FakeCatalog {
    replies: Mutex<HashMap<String, Reply>>,
    delays: Mutex<HashMap<String, Duration>>,
    hits: Mutex<Vec<String>>,
    auth: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn reply(&self, query: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(query.to_string(), reply);
    }

    pub fn delay(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    /// Requests seen so far, as `search:<query>` or `discover:<sort_by>`.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.auth.lock().unwrap().clone()
    }

    async fn respond(&self, key: &str, hit: String, headers: &HeaderMap) -> (StatusCode, Json<Value>) {
        self.hits.lock().unwrap().push(hit);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth.lock().unwrap().push(auth);

        let delay = self.delays.lock().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(key).cloned();
        match reply {
            Some(Reply::Page(body)) => (StatusCode::OK, Json(body)),
            Some(Reply::Status(status)) => {
                (status, Json(json!({ "status_message": "fake failure" })))
            }
            None => (StatusCode::OK, Json(json!({ "results": [] }))),
        }
    }
}

async fn search_movie(
    State(fake): State<Arc<FakeCatalog>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let query = params.get("query").cloned().unwrap_or_default();
    fake.respond(&query, format!("search:{query}"), &headers).await
}

async fn discover_movie(
    State(fake): State<Arc<FakeCatalog>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let sort = params.get("sort_by").cloned().unwrap_or_default();
    fake.respond("", format!("discover:{sort}"), &headers).await
}

pub async fn start_catalog(fake: Arc<FakeCatalog>) -> SocketAddr {
    let app = Router::new()
        .route("/3/search/movie", get(search_movie))
        .route("/3/discover/movie", get(discover_movie))
        .with_state(fake);
    serve(app).await
}

pub fn movie_json(id: u64, title: &str, poster: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": title,
        "vote_average": 7.4,
        "poster_path": poster,
        "release_date": "2005-06-15",
        "original_language": "en",
        "adult": false,
    })
}

pub fn page(movies: Vec<Value>) -> Reply {
    Reply::Page(json!({ "page": 1, "results": movies }))
}

// ---------------------------------------------------------------------------
// Session harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub catalog: Arc<FakeCatalog>,
    pub store: Arc<MemoryStore>,
    pub session: Arc<Session<MemoryStore>>,
}

impl TestHarness {
    pub async fn start(debounce: Duration) -> Self {
        let catalog = Arc::new(FakeCatalog::default());
        let addr = start_catalog(Arc::clone(&catalog)).await;
        let client = CatalogClient::new(reqwest::Client::new(), &catalog_config(addr));
        let store = Arc::new(MemoryStore::new());
        let session = Session::spawn(
            client,
            Arc::clone(&store),
            SessionOptions { debounce, trending_limit: 5 },
        );
        TestHarness { catalog, store, session }
    }

    /// Wait until the newest fetch has finished and the stabilized query is `query`.
    pub async fn settled_on(&self, query: &str) {
        let mut rx = self.session.subscribe();
        let wait = rx.wait_for(|s| s.stabilized_query.as_deref() == Some(query) && !s.loading);
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("session did not settle in time")
            .expect("session dropped");
    }
}

pub fn catalog_config(addr: SocketAddr) -> CatalogConfig {
    CatalogConfig {
        base_url: format!("http://{addr}/3"),
        api_token: TOKEN.to_string(),
        image_base_url: IMAGE_BASE.to_string(),
    }
}
