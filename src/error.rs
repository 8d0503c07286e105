//! Error types for saved-articles
//!
//! Two layers of errors live here:
//! - [`Error`] - crate-level failures (configuration, persistence, HTTP client setup,
//!   shutdown). These are returned from the public API with `?`.
//! - [`FetchError`] - the per-article error taxonomy. These never escape a batch run;
//!   they are reported through events and recorded in [`BatchProgress`](crate::types::BatchProgress).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for saved-articles operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for saved-articles
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// The string could not be turned into an article identifier
    #[error("invalid article identifier: {0}")]
    InvalidIdentifier(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// HTTP client error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new fetches
    #[error("shutdown in progress: not accepting new fetches")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Why fetching a single article did not succeed
///
/// Per-article errors are contained: they are reported to subscribers and recorded as the
/// batch's last error, but they never abort sibling fetches or the run itself.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FetchError {
    /// Transport or server failure; the article stays eligible for the next run
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The identifier no longer resolves to content
    #[error("article not found")]
    NotFound,

    /// The fetch was canceled before it finished
    #[error("fetch canceled")]
    Canceled,

    /// The adapter could not make sense of the result
    #[error("unknown fetch error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Returns true for the cancellation outcome, which is not a real failure
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }

    /// Returns true if retrying within the same run could not help
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::NotFound | FetchError::Unknown(_))
    }

    /// Machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::NetworkFailure(_) => "network_failure",
            FetchError::NotFound => "not_found",
            FetchError::Canceled => "canceled",
            FetchError::Unknown(_) => "unknown",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            return FetchError::NotFound;
        }
        if e.is_decode() {
            return FetchError::Unknown(e.to_string());
        }
        FetchError::NetworkFailure(e.to_string())
    }
}
