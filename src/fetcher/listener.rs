//! Saved page list change-feed listener.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::saved_list::{SavedListEvent, SavedPageList};

use super::SavedArticlesFetcher;

impl SavedArticlesFetcher {
    /// Keep the fetcher in sync with `list`
    ///
    /// Starts a run from the list's current contents, then translates each list change
    /// into the matching fetcher operation. If the listener falls behind the list's
    /// change feed it resynchronizes from a fresh snapshot. The listener stops when the
    /// list is dropped or the fetcher shuts down.
    pub fn follow(&self, list: Arc<SavedPageList>) -> JoinHandle<()> {
        let mut changes = list.subscribe();
        let fetcher = self.clone();

        tokio::spawn(async move {
            if let Err(e) = fetcher.start(list.snapshot().await).await {
                tracing::warn!(error = %e, "Saved list listener could not start");
                return;
            }

            loop {
                let change = tokio::select! {
                    _ = fetcher.shutdown_token.cancelled() => break,
                    change = changes.recv() => change,
                };

                let result = match change {
                    Ok(SavedListEvent::Added(id)) => fetcher.on_identifier_added(id).await.map(|_| ()),
                    Ok(SavedListEvent::Removed(id)) => {
                        fetcher.on_identifier_removed(&id).await;
                        Ok(())
                    }
                    Ok(SavedListEvent::Replaced(ids)) => fetcher.start(ids).await.map(|_| ()),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Saved list listener lagged, resynchronizing");
                        fetcher.start(list.snapshot().await).await.map(|_| ())
                    }
                    Err(RecvError::Closed) => break,
                };

                match result {
                    Ok(()) => {}
                    Err(Error::ShuttingDown) => break,
                    Err(e) => tracing::warn!(error = %e, "Failed to apply saved list change"),
                }
            }

            tracing::debug!("Saved list listener stopped");
        })
    }
}
