//! Test configuration helpers for creating fetchers against a mock REST server

use std::time::Duration;

use saved_articles::config::{CacheConfig, FetchConfig, SourceConfig};
use saved_articles::{Config, SavedArticlesFetcher};
use tempfile::TempDir;

/// Configuration pointing the REST source at `base_url` and the cache into `temp_dir`
pub fn test_config(base_url: &str, temp_dir: &TempDir) -> Config {
    Config {
        fetch: FetchConfig {
            max_concurrent_fetches: 2,
            cancel_timeout: Duration::from_secs(2),
            ..Default::default()
        },
        source: SourceConfig {
            rest_base_url: Some(base_url.to_string()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        cache: CacheConfig {
            database_path: temp_dir.path().join("saved_articles.db"),
        },
    }
}

/// Fetcher backed by REST + SQLite, with its database in a fresh temp directory
///
/// The temp directory must be kept alive for the duration of the test.
pub async fn create_test_fetcher(base_url: &str) -> (SavedArticlesFetcher, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config = test_config(base_url, &temp_dir);
    let fetcher = SavedArticlesFetcher::from_config(&config)
        .await
        .expect("create fetcher");
    (fetcher, temp_dir)
}
