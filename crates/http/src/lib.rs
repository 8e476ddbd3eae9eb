//! HTTP API over a running cinescope session.
//!
//! The routes mirror what a browser front end needs: read the current view,
//! set the search box, read the trending strip.
//!
//! - `GET  /api/state`: full [`ViewState`]
//! - `POST /api/query`: `{ "query": "..." }`, debounced like typing
//! - `GET  /api/trending`: trending entries only
//! - `GET  /api/health`: liveness

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cinescope_core::types::TrendingEntry;
use cinescope_core::{SearchCountStore, Session, ViewState};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the API router for `session`.
pub fn router<S: SearchCountStore + 'static>(session: Arc<Session<S>>) -> Router {
    Router::new()
        .route("/api/state", get(api_state::<S>))
        .route("/api/query", post(api_query::<S>))
        .route("/api/trending", get(api_trending::<S>))
        .route("/api/health", get(api_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn serve<S, F>(
    session: Arc<Session<S>>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    S: SearchCountStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");
    axum::serve(listener, router(session)).with_graceful_shutdown(shutdown).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn api_state<S: SearchCountStore + 'static>(
    State(session): State<Arc<Session<S>>>,
) -> Json<ViewState> {
    Json(session.state())
}

#[derive(Deserialize)]
pub struct QueryRequest {
    query: String,
}

pub async fn api_query<S: SearchCountStore + 'static>(
    State(session): State<Arc<Session<S>>>,
    Json(body): Json<QueryRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    session.set_query(body.query.clone());
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "searchMovie": body.query })))
}

pub async fn api_trending<S: SearchCountStore + 'static>(
    State(session): State<Arc<Session<S>>>,
) -> Json<Vec<TrendingEntry>> {
    Json(session.state().trending)
}

pub async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
