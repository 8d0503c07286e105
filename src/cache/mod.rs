//! Local storage for fetched articles
//!
//! The pipeline asks a [`LocalCache`] whether an article is already available before
//! spending a network request on it, and hands every freshly fetched article to it.
//! Implementations:
//!
//! - [`MemoryCache`]: process-local map, for tests and ephemeral use
//! - [`SqliteCache`]: SQLite database (one row per article)
//!
//! Whether a stored article is stale is up to the implementation; the pipeline treats
//! [`LocalCache::has`] as the final word.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ArticleContent, ArticleId};

/// Article storage consulted and populated by the fetch pipeline
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Returns true if `id` is available locally
    async fn has(&self, id: &ArticleId) -> Result<bool>;

    /// Persist freshly fetched content, replacing any earlier copy
    async fn store(&self, article: &ArticleContent) -> Result<()>;
}
