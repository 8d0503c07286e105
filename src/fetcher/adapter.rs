//! Per-article fetch: cache short-circuit, cancellation, error normalization.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::LocalCache;
use crate::error::FetchError;
use crate::source::ContentFetcher;
use crate::types::{ArticleId, TaskOutcome};

/// Successful result of a single article fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fetched {
    /// Content was downloaded and stored
    Downloaded,
    /// Content was already in the local cache; nothing was downloaded
    AlreadyCached,
}

impl From<Result<Fetched, FetchError>> for TaskOutcome {
    fn from(result: Result<Fetched, FetchError>) -> Self {
        match result {
            Ok(fetched) => TaskOutcome::Succeeded {
                from_cache: fetched == Fetched::AlreadyCached,
            },
            Err(FetchError::Canceled) => TaskOutcome::Canceled,
            Err(error) => TaskOutcome::Failed { error },
        }
    }
}

/// Wraps the content source and cache into one fetch-and-store operation
pub(crate) struct FetchAdapter {
    source: Arc<dyn ContentFetcher>,
    cache: Arc<dyn LocalCache>,
}

impl FetchAdapter {
    pub(crate) fn new(source: Arc<dyn ContentFetcher>, cache: Arc<dyn LocalCache>) -> Self {
        Self { source, cache }
    }

    /// Fetch `id` and store it locally
    ///
    /// Once `cancel` fires, the result is `FetchError::Canceled` regardless of what the
    /// cache lookup or the source returned. Storing the downloaded content is not
    /// interruptible.
    pub(crate) async fn fetch(
        &self,
        id: &ArticleId,
        cancel: &CancellationToken,
    ) -> Result<Fetched, FetchError> {
        let cached = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Canceled),
            result = self.cache.has(id) => result,
        };

        match cached {
            Ok(true) => {
                tracing::debug!(article = %id, "Article already cached");
                return Ok(Fetched::AlreadyCached);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(article = %id, error = %e, "Cache lookup failed, fetching anyway");
            }
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Canceled),
            result = self.source.fetch(id, cancel) => result,
        };

        let content = match fetched {
            Ok(content) => content,
            Err(_) if cancel.is_cancelled() => return Err(FetchError::Canceled),
            Err(FetchError::Canceled) => {
                tracing::error!(
                    article = %id,
                    source = self.source.name(),
                    "Content source reported cancellation without a cancel signal"
                );
                return Err(FetchError::Unknown(
                    "content source canceled the fetch on its own".to_string(),
                ));
            }
            Err(error) => {
                if let FetchError::Unknown(ref detail) = error {
                    tracing::error!(article = %id, error = %detail, "Unexpected fetch failure");
                }
                return Err(error);
            }
        };

        if let Err(e) = self.cache.store(&content).await {
            tracing::error!(article = %id, error = %e, "Failed to store fetched article");
            return Err(FetchError::Unknown(format!("failed to store article: {}", e)));
        }

        tracing::debug!(
            article = %id,
            bytes = content.html.len(),
            revision = ?content.revision,
            "Article stored"
        );
        Ok(Fetched::Downloaded)
    }
}
