//! Configuration types for saved-articles

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Fetch pipeline behavior (concurrency, cancellation, event buffering)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of articles fetched at the same time (default: 4)
    ///
    /// Identifiers that become eligible while the pipeline is at capacity wait in a
    /// FIFO queue until a slot frees.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// How long `cancel_all` waits for in-flight fetches to acknowledge (default: 10s)
    ///
    /// Fetches still running after this are abandoned.
    #[serde(default = "default_cancel_timeout")]
    pub cancel_timeout: Duration,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent(),
            cancel_timeout: default_cancel_timeout(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Article content source settings (REST endpoint, HTTP client)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL used instead of each article's own site (None = use the article's site)
    #[serde(default)]
    pub rest_base_url: Option<String>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: None,
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Local article storage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite database holding fetched articles (default: "./saved_articles.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`SavedArticlesFetcher`](crate::SavedArticlesFetcher)
///
/// - [`fetch`](FetchConfig) - concurrency and cancellation
/// - [`source`](SourceConfig) - where article content comes from
/// - [`cache`](CacheConfig) - where fetched content is kept
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetch pipeline behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Content source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Local storage settings
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Parse a configuration from JSON, filling in defaults and validating the result
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.fetch.validate()?;

        if let Some(base) = &self.source.rest_base_url
            && url::Url::parse(base).is_err()
        {
            return Err(Error::Config {
                message: format!("rest_base_url is not a valid URL: {}", base),
                key: Some("rest_base_url".to_string()),
            });
        }

        Ok(())
    }
}

impl FetchConfig {
    /// Check the pipeline limits
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("max_concurrent_fetches".to_string()),
            });
        }
        if self.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be at least 1".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        Ok(())
    }
}

fn default_max_concurrent() -> usize {
    4
}

fn default_cancel_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_event_buffer() -> usize {
    1000
}

fn default_user_agent() -> String {
    format!("saved-articles/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./saved_articles.db")
}
