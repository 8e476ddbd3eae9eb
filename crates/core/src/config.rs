//! Configuration: defaults, `.cinescope.toml`, then environment variables.
//!
//! Loaded once at startup. Callers layer CLI flags on top of the returned
//! [`Settings`] before calling [`Settings::resolve`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::types::{
    DEFAULT_CATALOG_BASE_URL, DEFAULT_DEBOUNCE_MS, DEFAULT_IMAGE_BASE_URL, DEFAULT_TRENDING_LIMIT,
};

/// Appwrite cloud endpoint used when none is configured.
pub const DEFAULT_APPWRITE_ENDPOINT: &str = "https://fra.cloud.appwrite.io/v1";

/// Known keys in `.cinescope.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] = &[
    "tmdb_api_key",
    "tmdb_base_url",
    "image_base_url",
    "appwrite_endpoint",
    "appwrite_project_id",
    "appwrite_database_id",
    "appwrite_collection_id",
    "appwrite_api_key",
    "debounce_ms",
    "trending_limit",
];

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_token: String,
    pub image_base_url: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    /// Server API key. Browser-style sessions work without one.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    /// `None` keeps search counts in memory for the life of the process.
    pub store: Option<StoreConfig>,
    pub debounce_ms: u64,
    pub trending_limit: usize,
}

// ---------------------------------------------------------------------------
// Partial settings (file + env + flags)
// ---------------------------------------------------------------------------

/// Unresolved settings. Every layer only overwrites what it sets.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: Option<String>,
    pub image_base_url: Option<String>,
    pub appwrite_endpoint: Option<String>,
    pub appwrite_project_id: Option<String>,
    pub appwrite_database_id: Option<String>,
    pub appwrite_collection_id: Option<String>,
    pub appwrite_api_key: Option<String>,
    pub debounce_ms: Option<u64>,
    pub trending_limit: Option<usize>,
}

impl Settings {
    /// Load settings from the config file (if any) and the process environment.
    ///
    /// `explicit` wins over the default search path of `./.cinescope.toml`
    /// followed by `~/.cinescope/config.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        match explicit {
            Some(path) => settings.merge_file(path)?,
            None => {
                if let Some(path) = default_config_paths().into_iter().find(|p| p.exists()) {
                    settings.merge_file(&path)?;
                }
            }
        }
        settings.merge_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Merge a TOML file. Unknown keys trigger a warning with a typo suggestion.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        debug!(path = %path.display(), "Loading config file");
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let table: toml::Table = content
            .parse()
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        self.merge_table(&table);
        Ok(())
    }

    pub fn merge_table(&mut self, table: &toml::Table) {
        for key in table.keys() {
            if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
                warn_unknown_key(key);
            }
        }

        let string = |key: &str| table.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());
        set_if_some(&mut self.tmdb_api_key, string("tmdb_api_key"));
        set_if_some(&mut self.tmdb_base_url, string("tmdb_base_url"));
        set_if_some(&mut self.image_base_url, string("image_base_url"));
        set_if_some(&mut self.appwrite_endpoint, string("appwrite_endpoint"));
        set_if_some(&mut self.appwrite_project_id, string("appwrite_project_id"));
        set_if_some(&mut self.appwrite_database_id, string("appwrite_database_id"));
        set_if_some(&mut self.appwrite_collection_id, string("appwrite_collection_id"));
        set_if_some(&mut self.appwrite_api_key, string("appwrite_api_key"));

        if let Some(v) = table.get("debounce_ms") {
            match v.as_integer().and_then(|n| u64::try_from(n).ok()) {
                Some(ms) => self.debounce_ms = Some(ms),
                None => warn!(value = %v, "debounce_ms must be a non-negative integer, ignoring"),
            }
        }
        if let Some(v) = table.get("trending_limit") {
            match v.as_integer().and_then(|n| usize::try_from(n).ok()) {
                Some(n) => self.trending_limit = Some(n),
                None => warn!(value = %v, "trending_limit must be a non-negative integer, ignoring"),
            }
        }
    }

    /// Overlay environment variables. `lookup` is `std::env::var` outside tests.
    pub fn merge_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        set_if_some(&mut self.tmdb_api_key, get("TMDB_API_KEY").or_else(|| get("VITE_TMDB_API_KEY")));
        set_if_some(&mut self.tmdb_base_url, get("TMDB_BASE_URL"));
        set_if_some(&mut self.image_base_url, get("TMDB_IMAGE_BASE_URL"));
        set_if_some(&mut self.appwrite_endpoint, get("APPWRITE_ENDPOINT"));
        set_if_some(
            &mut self.appwrite_project_id,
            get("APPWRITE_PROJECT_ID").or_else(|| get("VITE_APPWRITE_PROJECT_ID")),
        );
        set_if_some(
            &mut self.appwrite_database_id,
            get("APPWRITE_DATABASE_ID").or_else(|| get("VITE_APPWRITE_DATABASE_ID")),
        );
        set_if_some(
            &mut self.appwrite_collection_id,
            get("APPWRITE_COLLECTION_ID").or_else(|| get("VITE_APPWRITE_COLLECTION_ID")),
        );
        set_if_some(&mut self.appwrite_api_key, get("APPWRITE_API_KEY"));

        if let Some(raw) = get("CINESCOPE_DEBOUNCE_MS") {
            match raw.parse() {
                Ok(ms) => self.debounce_ms = Some(ms),
                Err(e) => warn!(value = raw.as_str(), error = %e, "Invalid CINESCOPE_DEBOUNCE_MS"),
            }
        }
        if let Some(raw) = get("CINESCOPE_TRENDING_LIMIT") {
            match raw.parse() {
                Ok(n) => self.trending_limit = Some(n),
                Err(e) => {
                    warn!(value = raw.as_str(), error = %e, "Invalid CINESCOPE_TRENDING_LIMIT")
                }
            }
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let api_token = self.tmdb_api_key.ok_or(ConfigError::Missing("TMDB_API_KEY"))?;

        let catalog = CatalogConfig {
            base_url: trim_slash(self.tmdb_base_url.as_deref().unwrap_or(DEFAULT_CATALOG_BASE_URL)),
            api_token,
            image_base_url: trim_slash(
                self.image_base_url.as_deref().unwrap_or(DEFAULT_IMAGE_BASE_URL),
            ),
        };

        let store = match (self.appwrite_project_id, self.appwrite_database_id, self.appwrite_collection_id) {
            (Some(project_id), Some(database_id), Some(collection_id)) => Some(StoreConfig {
                endpoint: trim_slash(
                    self.appwrite_endpoint.as_deref().unwrap_or(DEFAULT_APPWRITE_ENDPOINT),
                ),
                project_id,
                database_id,
                collection_id,
                api_key: self.appwrite_api_key,
            }),
            (None, None, None) => None,
            (project, database, collection) => {
                warn!(
                    project = project.is_some(),
                    database = database.is_some(),
                    collection = collection.is_some(),
                    "Incomplete Appwrite settings, keeping search counts in memory"
                );
                None
            }
        };

        let debounce_ms = self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS);
        let trending_limit = self.trending_limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
        if trending_limit == 0 {
            return Err(ConfigError::Invalid { key: "trending_limit", value: "0".into() });
        }

        Ok(Config { catalog, store, debounce_ms, trending_limit })
    }
}

/// `./.cinescope.toml`, then the per-user file (`~/.cinescope/config.toml`,
/// or `%APPDATA%\cinescope\config.toml` on Windows).
pub fn default_config_paths() -> Vec<PathBuf> {
    let user_dir = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join("cinescope"))
    } else {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cinescope"))
    };
    std::iter::once(PathBuf::from(".cinescope.toml"))
        .chain(user_dir.map(|dir| dir.join("config.toml")))
        .collect()
}

fn set_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn warn_unknown_key(key: &str) {
    match suggest_key(key) {
        Some(known) => {
            warn!(key, suggestion = known, "Unknown key in .cinescope.toml, did you mean '{known}'?")
        }
        None => warn!(
            key,
            "Unknown key in .cinescope.toml (known keys: {})",
            KNOWN_CONFIG_KEYS.join(", ")
        ),
    }
}

/// Closest entry of [`KNOWN_CONFIG_KEYS`] within three edits of `key`.
fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_CONFIG_KEYS
        .iter()
        .map(|known| (edit_distance(key, known), *known))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, known)| known)
}

/// Levenshtein distance over chars, one row at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}
