//! Cancellation and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::types::{CancelSummary, Event, RunPhase, TaskOutcome};

use super::SavedArticlesFetcher;

impl SavedArticlesFetcher {
    /// Cancel every pending and running fetch
    ///
    /// This method:
    /// 1. Ends every registered task and signals its cancellation token
    /// 2. Waits up to `cancel_timeout` for running workers to acknowledge
    /// 3. Aborts any canceled worker still running after the timeout, counts it as
    ///    canceled, and hands its slot to the next pending article
    ///
    /// The fetcher is Idle when this returns, unless new articles were admitted
    /// concurrently. Those keep running.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use saved_articles::*;
    /// # async fn example(fetcher: SavedArticlesFetcher) {
    /// let summary = fetcher.cancel_all().await;
    /// if summary.abandoned > 0 {
    ///     eprintln!("{} fetches did not stop in time", summary.abandoned);
    /// }
    /// # }
    /// ```
    pub async fn cancel_all(&self) -> CancelSummary {
        let canceled = {
            let mut state = self.state.lock().await;
            let ids = state.registry.all_ids();
            for id in &ids {
                self.cancel_task(&mut state, id);
            }
            state.pending.clear();
            self.finish_if_drained(&mut state);
            ids.len()
        };
        tracing::info!(canceled, "Signaled cancellation to all fetches");

        if self.wait_until_idle(self.config.cancel_timeout).await {
            tracing::info!("All fetches acknowledged cancellation");
            return CancelSummary {
                canceled,
                abandoned: 0,
            };
        }

        let mut state = self.state.lock().await;
        // workers whose task is still registered were admitted after the sweep above
        let stale: Vec<u64> = state
            .workers
            .iter()
            .filter(|(seq, worker)| {
                !state
                    .registry
                    .get(&worker.id)
                    .is_some_and(|task| task.seq == **seq)
            })
            .map(|(seq, _)| *seq)
            .collect();
        let stragglers: Vec<_> = stale
            .iter()
            .filter_map(|seq| state.workers.remove(seq))
            .collect();
        let abandoned = stragglers.len();

        for worker in stragglers {
            worker.handle.abort();
            tracing::warn!(
                article = %worker.id,
                timeout_ms = self.config.cancel_timeout.as_millis() as u64,
                "Fetch did not acknowledge cancellation in time, abandoning"
            );
            self.record_terminal(&mut state, &worker.id, TaskOutcome::Canceled);
        }

        self.pump(&mut state);
        self.finish_if_drained(&mut state);

        CancelSummary {
            canceled,
            abandoned,
        }
    }

    /// Wait until no run is active, up to `timeout`
    ///
    /// Returns false if a run was still active when the timeout elapsed.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let mut phase = self.phase_tx.subscribe();
        matches!(
            tokio::time::timeout(timeout, phase.wait_for(|p| *p == RunPhase::Idle)).await,
            Ok(Ok(_))
        )
    }

    /// Gracefully shut down the fetcher
    ///
    /// Stops accepting new articles, cancels everything in flight (see
    /// [`cancel_all`](Self::cancel_all)), stops list listeners started with
    /// [`follow`](Self::follow), and emits [`Event::Shutdown`].
    pub async fn shutdown(&self) -> CancelSummary {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.shutdown_token.cancel();

        let summary = self.cancel_all().await;
        if summary.abandoned > 0 {
            tracing::warn!(
                abandoned = summary.abandoned,
                "Shutdown abandoned fetches that did not stop"
            );
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        summary
    }
}
