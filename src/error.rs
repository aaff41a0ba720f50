//! Error types for the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failures reading or writing persisted collections.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed data for {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("Unsupported schema version {version} for {key}")]
    UnsupportedVersion { key: String, version: u64 },
}

/// Failures fetching quotes.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quote API returned error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to parse quote response: {0}")]
    Decode(String),

    #[error("Quote request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Quote source unavailable: {0}")]
    Unavailable(String),
}

/// Input rejected before it reaches a store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Invalid share count: {0} (must be a positive number)")]
    InvalidShares(f64),

    #[error("Unknown direction '{0}' (expected 'above' or 'below')")]
    UnknownDirection(String),
}
