//! Plain-text rendering of movies, trending entries, and session frames.

use std::fmt::Write;

use cinescope_core::types::{MovieSummary, TrendingEntry, UpsertOutcome};
use cinescope_core::ViewState;

const TITLE_WIDTH: usize = 48;

pub fn movie_line(movie: &MovieSummary) -> String {
    let rating = if movie.vote_average > 0.0 {
        format!("{:.1}", movie.vote_average)
    } else {
        "N/A".to_string()
    };
    let lang = if movie.original_language.is_empty() { "-" } else { movie.original_language.as_str() };
    format!(
        "{:<width$} {:>4}  {:>4}  {}",
        truncate(&movie.title, TITLE_WIDTH),
        movie.year().unwrap_or("N/A"),
        rating,
        lang,
        width = TITLE_WIDTH
    )
}

pub fn movie_table(movies: &[MovieSummary], limit: usize) -> String {
    let mut out = String::new();
    for movie in movies.iter().take(limit) {
        let _ = writeln!(out, "{}", movie_line(movie));
    }
    out
}

pub fn trending_table(entries: &[TrendingEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "{:>2}. {:<32} {:>5}  {}",
            e.rank,
            truncate(&e.search_term, 32),
            e.count,
            e.title
        );
    }
    out
}

pub fn upsert_line(outcome: &UpsertOutcome) -> String {
    match outcome {
        UpsertOutcome::Created { term, .. } => format!("First search for '{term}' recorded"),
        UpsertOutcome::Incremented { term, count, .. } => {
            format!("'{term}' has been searched {count} times")
        }
        UpsertOutcome::Failed { term, reason } => {
            format!("Could not record search for '{term}': {reason}")
        }
    }
}

/// One screen of the interactive view.
pub fn frame(state: &ViewState, limit: usize) -> String {
    let mut out = String::new();
    let heading = match state.stabilized_query.as_deref() {
        Some("") | None => "Popular movies".to_string(),
        Some(q) => format!("Results for '{q}'"),
    };
    let _ = writeln!(out, "── {heading} ──");

    if state.loading {
        let _ = writeln!(out, "Loading…");
    } else if let Some(error) = &state.error {
        let _ = writeln!(out, "error: {error}");
    } else if state.movies.is_empty() {
        let _ = writeln!(out, "No movies found");
    } else {
        out.push_str(&movie_table(&state.movies, limit));
    }

    if !state.trending.is_empty() {
        let _ = writeln!(out, "── Trending ──");
        out.push_str(&trending_table(&state.trending));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}
