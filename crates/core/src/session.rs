//! Session state machine and the debounced fetch pipeline.
//!
//! Every change to what a renderer sees goes through a [`SessionEvent`].
//! [`ViewState::apply`] returns a fresh state for each event; the session
//! publishes it on a watch channel and appends the event to a log.
//!
//! Fetches carry a generation number. Only the newest generation may end the
//! loading phase or replace the result list, so a slow response for an old
//! query cannot overwrite the results of a newer one. Older requests are not
//! aborted, their results are just ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::counts;
use crate::debounce::Debouncer;
use crate::store::SearchCountStore;
use crate::types::{MovieSummary, TrendingEntry, UpsertOutcome, FETCH_ERROR_MESSAGE};

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Everything a renderer needs. Replaced wholesale on every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    /// Raw contents of the search box.
    #[serde(rename = "searchMovie")]
    pub query: String,
    /// Last debounced query. `None` until the first fetch is requested.
    #[serde(rename = "debouncedSearchTerm")]
    pub stabilized_query: Option<String>,
    #[serde(rename = "movieList")]
    pub movies: Vec<MovieSummary>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(rename = "trendingMovies")]
    pub trending: Vec<TrendingEntry>,
    /// Generation of the newest fetch started.
    pub generation: u64,
    #[serde(rename = "lastUpsert")]
    pub last_upsert: Option<UpsertOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    QueryChanged { query: String },
    QueryStabilized { query: String },
    FetchStarted { generation: u64, query: String },
    FetchSucceeded { generation: u64, movies: Vec<MovieSummary> },
    FetchFailed { generation: u64, message: String },
    UpsertAttempted { outcome: UpsertOutcome },
    TrendingLoaded { entries: Vec<TrendingEntry> },
}

impl ViewState {
    /// State after `event`. Terminal fetch events from superseded generations
    /// leave the state untouched.
    pub fn apply(&self, event: &SessionEvent) -> ViewState {
        let mut next = self.clone();
        match event {
            SessionEvent::QueryChanged { query } => next.query = query.clone(),
            SessionEvent::QueryStabilized { query } => next.stabilized_query = Some(query.clone()),
            SessionEvent::FetchStarted { generation, .. } => {
                if *generation > self.generation {
                    next.generation = *generation;
                    next.loading = true;
                    next.error = None;
                }
            }
            SessionEvent::FetchSucceeded { generation, movies } => {
                if self.is_current(*generation) {
                    next.movies = movies.clone();
                    next.loading = false;
                    next.error = None;
                }
            }
            SessionEvent::FetchFailed { generation, message } => {
                if self.is_current(*generation) {
                    next.movies.clear();
                    next.loading = false;
                    next.error = Some(message.clone());
                }
            }
            SessionEvent::UpsertAttempted { outcome } => next.last_upsert = Some(outcome.clone()),
            SessionEvent::TrendingLoaded { entries } => next.trending = entries.clone(),
        }
        next
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub debounce: Duration,
    pub trending_limit: usize,
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            trending_limit: config.trending_limit,
        }
    }
}

pub struct Session<S> {
    catalog: CatalogClient,
    store: Arc<S>,
    trending_limit: usize,
    debouncer: Debouncer,
    generation: AtomicU64,
    state: watch::Sender<ViewState>,
    log: Mutex<Vec<SessionEvent>>,
}

impl<S: SearchCountStore + 'static> Session<S> {
    /// Create a session and spawn the task that turns debounced queries into
    /// fetches. The task ends when the session is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(catalog: CatalogClient, store: Arc<S>, options: SessionOptions) -> Arc<Self> {
        let (debouncer, rx) = Debouncer::new(options.debounce);
        let (state, _) = watch::channel(ViewState::default());
        let session = Arc::new(Session {
            catalog,
            store,
            trending_limit: options.trending_limit,
            debouncer,
            generation: AtomicU64::new(0),
            state,
            log: Mutex::new(Vec::new()),
        });
        tokio::spawn(drive(Arc::downgrade(&session), rx));
        session
    }

    /// Initial load: trending strip plus the default popular list.
    pub async fn start(&self) {
        info!(trending_limit = self.trending_limit, "Starting session");
        tokio::join!(self.refresh_trending(), self.submit(String::new()));
    }

    /// New contents of the search box. The fetch happens after the debounce delay.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.emit(SessionEvent::QueryChanged { query: query.clone() });
        self.debouncer.push(query);
    }

    /// Handle a stabilized query: fetch if it differs from the current one.
    pub async fn submit(&self, query: String) {
        let unchanged = self.state.borrow().stabilized_query.as_deref() == Some(query.as_str());
        if unchanged {
            debug!(query = query.as_str(), "Stabilized query unchanged, not fetching");
            return;
        }
        self.emit(SessionEvent::QueryStabilized { query: query.clone() });
        self.fetch_movies(&query).await;
    }

    /// Fetch movies for `query` and, for a non-empty query with results,
    /// count the search against the top result.
    pub async fn fetch_movies(&self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(SessionEvent::FetchStarted { generation, query: query.to_string() });
        let guard = FetchGuard { session: self, generation, armed: true };

        let terminal = match self.catalog.fetch_movies(query).await {
            Err(e) => {
                error!(query, generation, error = %e, "Error while fetching movies");
                SessionEvent::FetchFailed { generation, message: FETCH_ERROR_MESSAGE.to_string() }
            }
            Ok(page) if page.is_logical_failure() => {
                let message = page.failure_message();
                warn!(query, generation, message = message.as_str(), "Catalog reported failure");
                SessionEvent::FetchFailed { generation, message }
            }
            Ok(page) if page.results.is_none() && !query.is_empty() => {
                warn!(query, generation, "Catalog response has no results list");
                SessionEvent::FetchFailed { generation, message: FETCH_ERROR_MESSAGE.to_string() }
            }
            Ok(page) => {
                let movies = page.into_movies();
                if !query.is_empty() {
                    if let Some(top) = movies.first() {
                        let outcome = counts::update_search_count(
                            self.store.as_ref(),
                            query,
                            top,
                            self.catalog.image_base_url(),
                        )
                        .await;
                        self.emit(SessionEvent::UpsertAttempted { outcome });
                    }
                }
                SessionEvent::FetchSucceeded { generation, movies }
            }
        };

        guard.finish(terminal);
    }

    /// Run [`Session::start`] on its own task, so callers such as the HTTP
    /// server can answer requests while the initial load is in flight.
    pub fn start_in_background(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.start().await })
    }

    /// Reload the trending strip from the store.
    pub async fn refresh_trending(&self) {
        let entries = counts::get_trending_movies(self.store.as_ref(), self.trending_limit).await;
        self.emit(SessionEvent::TrendingLoaded { entries });
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Every event applied so far, oldest first.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn debounce(&self) -> Duration {
        self.debouncer.delay()
    }

    fn emit(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        self.state.send_modify(|state| *state = state.apply(&event));
        log.push(event);
    }
}

/// Ends a fetch's loading phase even if the fetch future is dropped early.
struct FetchGuard<'a, S: SearchCountStore + 'static> {
    session: &'a Session<S>,
    generation: u64,
    armed: bool,
}

impl<S: SearchCountStore + 'static> FetchGuard<'_, S> {
    fn finish(mut self, terminal: SessionEvent) {
        self.armed = false;
        self.session.emit(terminal);
    }
}

impl<S: SearchCountStore + 'static> Drop for FetchGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            warn!(generation = self.generation, "Fetch abandoned before completion");
            self.session.emit(SessionEvent::FetchFailed {
                generation: self.generation,
                message: FETCH_ERROR_MESSAGE.to_string(),
            });
        }
    }
}

async fn drive<S: SearchCountStore + 'static>(
    weak: Weak<Session<S>>,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(query) = rx.recv().await {
        let Some(session) = weak.upgrade() else { break };
        tokio::spawn(async move { session.submit(query).await });
    }
    debug!("Session driver stopped");
}
