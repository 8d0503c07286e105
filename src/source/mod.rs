//! Article content sources
//!
//! The pipeline talks to one [`ContentFetcher`] trait object chosen when the
//! [`SavedArticlesFetcher`](crate::SavedArticlesFetcher) is constructed. Each implementation
//! is one strategy for turning an [`ArticleId`] into [`ArticleContent`]:
//!
//! - [`RestContentFetcher`]: MediaWiki REST API over HTTP

mod rest;

pub use rest::RestContentFetcher;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::types::{ArticleContent, ArticleId};

/// Retrieves the content of one article
///
/// Implementations should watch `cancel` and return [`FetchError::Canceled`] promptly once
/// it fires. The pipeline does not rely on that: it stops waiting on its own when the
/// token is canceled.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the content of `id`
    async fn fetch(
        &self,
        id: &ArticleId,
        cancel: &CancellationToken,
    ) -> Result<ArticleContent, FetchError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
