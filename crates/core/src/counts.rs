//! Search-count upsert and trending reads.
//!
//! Both operations swallow store failures: the upsert reports them as
//! [`UpsertOutcome::Failed`], the trending read falls back to an empty list.
//! The find-then-update sequence is not transactional; two sessions counting
//! the same term at once can lose an increment.

use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::store::SearchCountStore;
use crate::types::{MovieSummary, NewSearchCount, TrendingEntry, UpsertOutcome};

/// Record one qualifying search for `term`, whose top result was `movie`.
pub async fn update_search_count<S: SearchCountStore>(
    store: &S,
    term: &str,
    movie: &MovieSummary,
    image_base_url: &str,
) -> UpsertOutcome {
    match try_update_search_count(store, term, movie, image_base_url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(term, movie_id = movie.id, error = %e, "Failed to update search count");
            UpsertOutcome::Failed { term: term.to_string(), reason: e.to_string() }
        }
    }
}

async fn try_update_search_count<S: SearchCountStore>(
    store: &S,
    term: &str,
    movie: &MovieSummary,
    image_base_url: &str,
) -> Result<UpsertOutcome, StoreError> {
    match store.find_by_term(term).await? {
        Some(doc) => {
            let updated = store.update_count(&doc.id, doc.count + 1).await?;
            debug!(term, count = updated.count, "Incremented search count");
            Ok(UpsertOutcome::Incremented {
                term: term.to_string(),
                id: updated.id,
                count: updated.count,
            })
        }
        None => {
            let created =
                store.create(NewSearchCount::first_search(term, movie, image_base_url)).await?;
            debug!(term, id = created.id.as_str(), "Created search count");
            Ok(UpsertOutcome::Created { term: term.to_string(), id: created.id })
        }
    }
}

/// Top `limit` searches by count, or the store's error.
pub async fn fetch_trending<S: SearchCountStore>(
    store: &S,
    limit: usize,
) -> Result<Vec<TrendingEntry>, StoreError> {
    let records = store.top_by_count(limit).await?;
    Ok(TrendingEntry::ranked(records))
}

/// Top `limit` searches by count; empty when the store is unreachable.
pub async fn get_trending_movies<S: SearchCountStore>(store: &S, limit: usize) -> Vec<TrendingEntry> {
    match fetch_trending(store, limit).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to fetch trending movies");
            Vec::new()
        }
    }
}
