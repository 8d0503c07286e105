//! # saved-articles
//!
//! Background downloader for a user's saved ("read later") wiki articles.
//!
//! ## Overview
//!
//! The crate keeps a local copy of every article on a saved page list:
//! - **Deduplicated** - at most one fetch per article is ever in flight
//! - **Bounded** - fetches run on a fixed number of worker slots, extras wait in FIFO order
//! - **Cache-aware** - articles already stored locally are never downloaded again
//! - **Cancelable** - removing an article cancels its fetch; `cancel_all` stops everything
//!   and abandons workers that do not stop in time
//! - **Event-driven** - consumers subscribe to per-article events and batch progress
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use saved_articles::{ArticleId, Config, SavedArticlesFetcher, SavedPageList};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = SavedArticlesFetcher::from_config(&Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = fetcher.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Keep the local copy in sync with the saved list
//!     let list = Arc::new(SavedPageList::new());
//!     fetcher.follow(list.clone());
//!     list.add(ArticleId::parse("https://en.wikipedia.org/wiki/Tardigrade")?).await;
//!
//!     saved_articles::run_until_signal(fetcher).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Local article storage
pub mod cache;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fetch orchestrator (decomposed into focused submodules)
pub mod fetcher;
/// The user's saved page list
pub mod saved_list;
/// Article content sources
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use cache::{LocalCache, MemoryCache, SqliteCache};
pub use config::{CacheConfig, Config, FetchConfig, SourceConfig};
pub use error::{DatabaseError, Error, FetchError, Result};
pub use fetcher::SavedArticlesFetcher;
pub use saved_list::{SavedListEvent, SavedPageList};
pub use source::{ContentFetcher, RestContentFetcher};
pub use types::{
    ArticleContent, ArticleId, BatchProgress, CancelSummary, Event, RunPhase, TaskOutcome,
    TaskState,
};

/// Run the fetcher until a shutdown signal arrives, then shut it down
///
/// Waits for SIGTERM or SIGINT (Ctrl+C) on Unix, Ctrl+C elsewhere, then calls
/// [`SavedArticlesFetcher::shutdown`].
///
/// # Example
///
/// ```no_run
/// use saved_articles::{Config, SavedArticlesFetcher, run_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = SavedArticlesFetcher::from_config(&Config::default()).await?;
///
///     // Run with automatic signal handling
///     let summary = run_until_signal(fetcher).await;
///     println!("abandoned {} fetches", summary.abandoned);
///
///     Ok(())
/// }
/// ```
pub async fn run_until_signal(fetcher: SavedArticlesFetcher) -> CancelSummary {
    wait_for_signal().await;
    fetcher.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Handler registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
