//! Run control: start from a snapshot, react to articles added and removed.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use futures::future::join_all;

use crate::error::{Error, Result};
use crate::types::{ArticleId, Event, RunPhase, TaskOutcome, TaskState};

use super::{RunState, SavedArticlesFetcher};

impl SavedArticlesFetcher {
    /// Fetch every article in `snapshot` that is not already cached
    ///
    /// Duplicates in the snapshot are ignored. When no run is active, this begins a new
    /// run; progress is reset to cover the admitted articles, and the phase stays Idle
    /// when nothing needed fetching. When a run is already active, the call reconciles:
    /// in-flight articles missing from `snapshot` are canceled and newly listed ones
    /// join the current run.
    ///
    /// # Returns
    ///
    /// The number of articles admitted for fetching, or [`Error::ShuttingDown`] once
    /// [`shutdown`](Self::shutdown) has been called.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use saved_articles::*;
    /// # async fn example(fetcher: SavedArticlesFetcher) -> Result<()> {
    /// let rust = ArticleId::parse("https://en.wikipedia.org/wiki/Rust_(programming_language)")?;
    /// let admitted = fetcher.start([rust]).await?;
    /// println!("fetching {} articles", admitted);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self, snapshot: impl IntoIterator<Item = ArticleId>) -> Result<usize> {
        self.ensure_accepting()?;

        let mut seen = HashSet::new();
        let wanted: Vec<ArticleId> = snapshot
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let cached = join_all(wanted.iter().map(|id| self.is_cached(id))).await;
        let eligible: Vec<ArticleId> = wanted
            .iter()
            .zip(cached)
            .filter(|(_, cached)| !cached)
            .map(|(id, _)| id.clone())
            .collect();

        let mut state = self.state.lock().await;

        let stale: Vec<ArticleId> = state
            .registry
            .all_ids()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        for id in &stale {
            self.cancel_task(&mut state, id);
        }
        if !stale.is_empty() {
            tracing::info!(canceled = stale.len(), "Canceled fetches no longer in the saved list");
            self.finish_if_drained(&mut state);
        }

        let cached = wanted.len() - eligible.len();
        let admitted = self.admit_all(&mut state, eligible);

        tracing::info!(
            listed = wanted.len(),
            cached,
            admitted,
            "Saved list snapshot processed"
        );

        Ok(admitted)
    }

    /// A single article was added to the saved list
    ///
    /// Returns true if a fetch was admitted, false if the article was already cached or
    /// already in flight.
    pub async fn on_identifier_added(&self, id: ArticleId) -> Result<bool> {
        self.ensure_accepting()?;

        if self.is_cached(&id).await {
            tracing::debug!(article = %id, "Added article already cached");
            return Ok(false);
        }

        let mut state = self.state.lock().await;
        Ok(self.admit_all(&mut state, vec![id]) == 1)
    }

    /// A single article was removed from the saved list
    ///
    /// Cancels its fetch if one is pending or running. A pending fetch is counted as
    /// canceled immediately; a running one is counted when its worker stops. Returns
    /// false if nothing was in flight.
    pub async fn on_identifier_removed(&self, id: &ArticleId) -> bool {
        let mut state = self.state.lock().await;
        let removed = self.cancel_task(&mut state, id);
        if removed {
            self.finish_if_drained(&mut state);
        }
        removed
    }

    pub(crate) fn ensure_accepting(&self) -> Result<()> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        Ok(())
    }

    /// Cache lookup that treats errors as "not cached"
    async fn is_cached(&self, id: &ArticleId) -> bool {
        match self.cache.has(id).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(article = %id, error = %e, "Cache lookup failed, treating as not cached");
                false
            }
        }
    }

    /// Register and dispatch (or queue) each article not already in flight
    ///
    /// Begins a run if none is active. Returns how many were admitted.
    fn admit_all(&self, state: &mut RunState, ids: Vec<ArticleId>) -> usize {
        let starting = state.phase == RunPhase::Idle;
        if starting {
            state.progress.reset(0);
        }

        let mut admitted = Vec::new();
        for id in ids {
            if !state.registry.try_begin(&id) {
                tracing::debug!(article = %id, "Article already in flight");
                continue;
            }
            if let Some(seq) = state.registry.get(&id).map(|task| task.seq) {
                admitted.push((id, seq));
            }
        }
        let count = admitted.len();
        state.progress.extend(count);

        if starting && count > 0 {
            self.set_phase(state, RunPhase::Running);
            self.emit_event(Event::RunStarted { total: count });
            tracing::info!(total = count, "Fetch run started");
        }

        for (id, seq) in admitted {
            let slot = if state.pending.is_empty() {
                self.try_acquire_slot()
            } else {
                None
            };
            match slot {
                Some(permit) => self.dispatch(state, id, seq, permit),
                None => {
                    state.pending.push_back((id.clone(), seq));
                    self.emit_event(Event::Queued { id });
                }
            }
        }

        if starting || count > 0 {
            self.publish_progress(state);
        }

        count
    }

    /// End the task for `id` and signal it to stop
    ///
    /// Pending tasks are counted as canceled on the spot. Returns false if `id` had no task.
    pub(crate) fn cancel_task(&self, state: &mut RunState, id: &ArticleId) -> bool {
        let Some(task) = state.registry.end(id) else {
            return false;
        };
        task.cancel.cancel();

        match task.state {
            TaskState::Pending => {
                state.pending.retain(|(_, seq)| *seq != task.seq);
                tracing::debug!(article = %id, "Pending fetch canceled");
                self.record_terminal(state, id, TaskOutcome::Canceled);
            }
            _ => {
                tracing::debug!(article = %id, "Running fetch signaled to cancel");
            }
        }
        true
    }
}
