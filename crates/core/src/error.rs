//! Error types for the catalog client, the document store, and config loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("catalog returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("catalog response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid catalog URL: {0}")]
    Url(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("store returned HTTP {status}: {message}")]
    Status { status: reqwest::StatusCode, message: String },

    #[error("store response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("document {0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing {0}: set it in the environment or in .cinescope.toml")]
    Missing(&'static str),

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
