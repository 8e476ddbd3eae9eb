//! In-process stand-in for the Appwrite Databases REST API.
//!
//! Supports the subset the search-count store uses: list with `equal`,
//! `orderDesc` and `limit` queries, create, and patch.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use cinescope_core::config::StoreConfig;

pub const PROJECT: &str = "proj";
pub const DATABASE: &str = "movies-db";
pub const COLLECTION: &str = "metrics";

#[derive(Default)]
pub struct FakeAppwrite {
    docs: Mutex<Vec<Value>>,
    failing: Mutex<bool>,
    projects_seen: Mutex<Vec<String>>,
}

type Reply = (StatusCode, Json<Value>);

impl FakeAppwrite {
    pub fn docs(&self) -> Vec<Value> {
        self.docs.lock().unwrap().clone()
    }

    pub fn seed(&self, id: &str, term: &str, count: u64) {
        self.docs.lock().unwrap().push(json!({
            "$id": id,
            "searchTerm": term,
            "count": count,
            "movie_id": 1,
            "poster_url": "./no-movie.png",
            "title": term,
        }));
    }

    /// Make every request fail with a 503 and an Appwrite-style error body.
    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn projects_seen(&self) -> Vec<String> {
        self.projects_seen.lock().unwrap().clone()
    }

    fn check(&self, headers: &HeaderMap) -> Option<Reply> {
        let project = headers
            .get("x-appwrite-project")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.projects_seen.lock().unwrap().push(project);
        if *self.failing.lock().unwrap() {
            return Some((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "Database is offline", "code": 503 })),
            ));
        }
        None
    }
}

async fn list_documents(
    State(fake): State<Arc<FakeAppwrite>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Reply {
    if let Some(reply) = fake.check(&headers) {
        return reply;
    }
    let mut docs = fake.docs();
    let mut limit = 25usize;
    for (_, raw) in params.iter().filter(|(k, _)| k == "queries[]") {
        let q: Value = match serde_json::from_str(raw) {
            Ok(q) => q,
            Err(_) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid query" })))
            }
        };
        match q["method"].as_str() {
            Some("equal") => {
                let attr = q["attribute"].as_str().unwrap_or_default().to_string();
                let wanted = q["values"].as_array().cloned().unwrap_or_default();
                docs.retain(|d| wanted.contains(&d[attr.as_str()]));
            }
            Some("orderDesc") => {
                let attr = q["attribute"].as_str().unwrap_or_default().to_string();
                docs.sort_by(|a, b| {
                    b[attr.as_str()].as_u64().unwrap_or(0).cmp(&a[attr.as_str()].as_u64().unwrap_or(0))
                });
            }
            Some("limit") => limit = q["values"][0].as_u64().unwrap_or(25) as usize,
            _ => return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Unknown query" }))),
        }
    }
    let total = docs.len();
    docs.truncate(limit);
    (StatusCode::OK, Json(json!({ "total": total, "documents": docs })))
}

async fn create_document(
    State(fake): State<Arc<FakeAppwrite>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Some(reply) = fake.check(&headers) {
        return reply;
    }
    let id = body["documentId"].as_str().unwrap_or_default().to_string();
    let mut doc: Map<String, Value> = body["data"].as_object().cloned().unwrap_or_default();
    doc.insert("$id".into(), Value::String(id));
    let doc = Value::Object(doc);
    fake.docs.lock().unwrap().push(doc.clone());
    (StatusCode::CREATED, Json(doc))
}

async fn update_document(
    State(fake): State<Arc<FakeAppwrite>>,
    headers: HeaderMap,
    Path((_db, _col, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    if let Some(reply) = fake.check(&headers) {
        return reply;
    }
    let mut docs = fake.docs.lock().unwrap();
    let Some(doc) = docs.iter_mut().find(|d| d["$id"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Document not found" })));
    };
    if let (Some(target), Some(patch)) = (doc.as_object_mut(), body["data"].as_object()) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
    (StatusCode::OK, Json(doc.clone()))
}

pub async fn start(fake: Arc<FakeAppwrite>) -> SocketAddr {
    let app = Router::new()
        .route(
            "/v1/databases/{db}/collections/{col}/documents",
            get(list_documents).post(create_document),
        )
        .route("/v1/databases/{db}/collections/{col}/documents/{id}", patch(update_document))
        .with_state(fake);
    super::serve(app).await
}

pub fn store_config(addr: SocketAddr) -> StoreConfig {
    StoreConfig {
        endpoint: format!("http://{addr}/v1"),
        project_id: PROJECT.to_string(),
        database_id: DATABASE.to_string(),
        collection_id: COLLECTION.to_string(),
        api_key: None,
    }
}
