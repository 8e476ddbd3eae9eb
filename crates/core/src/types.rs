use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default TMDB v3 API root.
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Prefix for poster paths returned by the catalog (w500 rendition).
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Poster shown when the catalog has no image for a movie.
pub const NO_POSTER_URL: &str = "./no-movie.png";

/// Message surfaced to the user for any catalog failure without its own text.
pub const FETCH_ERROR_MESSAGE: &str = "failed to fetch movies";

/// Quiet period before a typed query is considered stable.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Number of records shown in the trending strip.
pub const DEFAULT_TRENDING_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// A movie as returned by the catalog's search and discover endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub original_language: String,
}

impl MovieSummary {
    /// Release year, if the catalog supplied a `YYYY-MM-DD` date.
    pub fn year(&self) -> Option<&str> {
        self.release_date.get(..4).filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }
}

/// One page of catalog results.
///
/// `response` and `error` are only present when the API reports a logical
/// failure inside a 2xx response. `results` is `None` when the body has no
/// results list at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<MovieSummary>>,
}

impl CatalogPage {
    /// True when the body carries `"response": "False"`.
    pub fn is_logical_failure(&self) -> bool {
        self.response.as_deref() == Some("False")
    }

    /// Message to show for a logical failure.
    pub fn failure_message(&self) -> String {
        match self.error.as_deref() {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => FETCH_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn movies(&self) -> &[MovieSummary] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn into_movies(self) -> Vec<MovieSummary> {
        self.results.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Store types
// ---------------------------------------------------------------------------

/// A search-count document as stored in the document database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCountRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: u64,
    pub movie_id: u64,
    pub poster_url: String,
    #[serde(default)]
    pub title: String,
}

/// Fields for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSearchCount {
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: u64,
    pub movie_id: u64,
    pub poster_url: String,
    pub title: String,
}

impl NewSearchCount {
    /// First sighting of `term`, pointing at the top result `movie`.
    pub fn first_search(term: &str, movie: &MovieSummary, image_base_url: &str) -> Self {
        Self {
            search_term: term.to_string(),
            count: 1,
            movie_id: movie.id,
            poster_url: poster_url(image_base_url, movie.poster_path.as_deref()),
            title: movie.title.clone(),
        }
    }
}

/// Build a poster URL, substituting [`NO_POSTER_URL`] when the path is missing.
pub fn poster_url(image_base_url: &str, poster_path: Option<&str>) -> String {
    match poster_path {
        Some(path) if !path.is_empty() => format!("{image_base_url}{path}"),
        _ => NO_POSTER_URL.to_string(),
    }
}

/// A row of the trending strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingEntry {
    /// 1-based position by descending count.
    pub rank: usize,
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: u64,
    pub movie_id: u64,
    pub poster_url: String,
    pub title: String,
}

impl TrendingEntry {
    pub fn ranked(records: Vec<SearchCountRecord>) -> Vec<TrendingEntry> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, r)| TrendingEntry {
                rank: i + 1,
                id: r.id,
                search_term: r.search_term,
                count: r.count,
                movie_id: r.movie_id,
                poster_url: r.poster_url,
                title: r.title,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Upsert outcome
// ---------------------------------------------------------------------------

/// What a search-count upsert did. Failures are carried as values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created { term: String, id: String },
    Incremented { term: String, id: String, count: u64 },
    Failed { term: String, reason: String },
}

impl UpsertOutcome {
    pub fn term(&self) -> &str {
        match self {
            UpsertOutcome::Created { term, .. }
            | UpsertOutcome::Incremented { term, .. }
            | UpsertOutcome::Failed { term, .. } => term,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UpsertOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(poster: Option<&str>) -> MovieSummary {
        MovieSummary {
            id: 7,
            title: "Heat".into(),
            vote_average: 8.3,
            poster_path: poster.map(|s| s.to_string()),
            release_date: "1995-12-15".into(),
            original_language: "en".into(),
        }
    }

    #[test]
    fn poster_url_joins_base_and_path() {
        assert_eq!(
            poster_url(DEFAULT_IMAGE_BASE_URL, Some("/x.jpg")),
            "https://image.tmdb.org/t/p/w500/x.jpg"
        );
    }

    #[test]
    fn missing_poster_uses_placeholder() {
        assert_eq!(poster_url(DEFAULT_IMAGE_BASE_URL, None), NO_POSTER_URL);
        assert_eq!(poster_url(DEFAULT_IMAGE_BASE_URL, Some("")), NO_POSTER_URL);
    }

    #[test]
    fn first_search_starts_at_one() {
        let rec = NewSearchCount::first_search("heat", &movie(Some("/h.jpg")), "http://img");
        assert_eq!(rec.count, 1);
        assert_eq!(rec.movie_id, 7);
        assert_eq!(rec.poster_url, "http://img/h.jpg");
        assert_eq!(rec.title, "Heat");
    }

    #[test]
    fn page_decodes_sparse_movies() {
        let page: CatalogPage =
            serde_json::from_str(r#"{"results":[{"id":1,"title":"A","poster_path":null}]}"#)
                .unwrap();
        assert!(!page.is_logical_failure());
        assert_eq!(page.movies()[0].poster_path, None);
        assert_eq!(page.movies()[0].release_date, "");
    }

    #[test]
    fn logical_failure_falls_back_to_generic_message() {
        let page: CatalogPage = serde_json::from_str(r#"{"response":"False"}"#).unwrap();
        assert!(page.is_logical_failure());
        assert_eq!(page.failure_message(), FETCH_ERROR_MESSAGE);
        assert!(page.movies().is_empty());
    }

    #[test]
    fn missing_results_differs_from_empty_results() {
        let missing: CatalogPage = serde_json::from_str(r#"{"page":1}"#).unwrap();
        assert_eq!(missing.results, None);
        assert!(missing.movies().is_empty());

        let empty: CatalogPage = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(empty.results, Some(vec![]));
    }

    #[test]
    fn year_requires_digits() {
        assert_eq!(movie(None).year(), Some("1995"));
        let mut m = movie(None);
        m.release_date = String::new();
        assert_eq!(m.year(), None);
    }

    #[test]
    fn record_uses_store_field_names() {
        let json = serde_json::to_value(NewSearchCount::first_search(
            "heat",
            &movie(None),
            DEFAULT_IMAGE_BASE_URL,
        ))
        .unwrap();
        assert_eq!(json["searchTerm"], "heat");
        assert_eq!(json["poster_url"], NO_POSTER_URL);
    }
}
