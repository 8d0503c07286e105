//! Worker dispatch and terminal-result handling.
//!
//! Each worker holds a permit from the fetcher's slot semaphore until its worker exits,
//! even after the article was canceled, so the number of live workers never exceeds
//! `max_concurrent_fetches`.

use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::types::{ArticleId, Event, RunPhase, TaskOutcome};

use super::{RunState, SavedArticlesFetcher, Worker};

impl SavedArticlesFetcher {
    /// Spawn a worker for the pending task `seq` of `id`, occupying `permit`'s slot
    pub(crate) fn dispatch(
        &self,
        state: &mut RunState,
        id: ArticleId,
        seq: u64,
        permit: OwnedSemaphorePermit,
    ) {
        if !state.registry.mark_running(&id, seq) {
            return;
        }
        let Some(cancel) = state.registry.get(&id).map(|task| task.cancel.clone()) else {
            return;
        };

        let fetcher = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let outcome = TaskOutcome::from(fetcher.adapter.fetch(&task_id, &cancel).await);
            fetcher.on_fetch_terminal(seq, task_id, outcome).await;
        });

        state.workers.insert(
            seq,
            Worker {
                id: id.clone(),
                handle,
                _permit: permit,
            },
        );
        tracing::debug!(
            article = %id,
            active = state.workers.len(),
            free_slots = self.slots.available_permits(),
            in_flight = state.registry.len(),
            "Fetch dispatched"
        );
        self.emit_event(Event::Fetching { id });
    }

    /// Free slot for a new worker, if any
    pub(crate) fn try_acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }

    /// Fill free worker slots from the pending queue, oldest first
    ///
    /// Must run after anything that removes a worker entry.
    pub(crate) fn pump(&self, state: &mut RunState) {
        while !state.pending.is_empty() {
            let Some(permit) = self.try_acquire_slot() else {
                break;
            };
            let Some((id, seq)) = state.pending.pop_front() else {
                break;
            };
            self.dispatch(state, id, seq, permit);
        }
    }

    /// Handle a worker's final result
    ///
    /// Results from workers that were already abandoned are dropped. Otherwise the
    /// outcome is counted, the freed slot is refilled, and the run finishes if nothing
    /// is left.
    pub(crate) async fn on_fetch_terminal(&self, seq: u64, id: ArticleId, outcome: TaskOutcome) {
        let mut state = self.state.lock().await;

        if state.workers.remove(&seq).is_none() {
            tracing::debug!(article = %id, "Ignoring result from abandoned fetch");
            return;
        }

        if state.registry.end_if(&id, seq) {
            self.record_terminal(&mut state, &id, outcome);
        } else {
            // ended by removal or cancel_all; the worker acknowledged the signal
            self.record_terminal(&mut state, &id, TaskOutcome::Canceled);
        }

        self.pump(&mut state);
        self.finish_if_drained(&mut state);
    }

    /// Count a terminal outcome, then notify subscribers
    pub(crate) fn record_terminal(&self, state: &mut RunState, id: &ArticleId, outcome: TaskOutcome) {
        let snapshot = state.progress.record_terminal(id, &outcome);

        let event = match outcome {
            TaskOutcome::Succeeded { from_cache } => {
                tracing::info!(article = %id, from_cache, progress = snapshot.fraction, "Article fetched");
                Event::ItemFetched {
                    id: id.clone(),
                    from_cache,
                    progress: snapshot.fraction,
                }
            }
            TaskOutcome::Failed { error } => {
                tracing::warn!(article = %id, error = %error, code = error.code(), "Article fetch failed");
                Event::ItemFailed {
                    id: id.clone(),
                    progress: snapshot.fraction,
                    error,
                }
            }
            TaskOutcome::Canceled => {
                tracing::debug!(article = %id, "Article fetch canceled");
                Event::ItemCanceled { id: id.clone() }
            }
        };

        self.emit_event(event);
        self.publish_progress(state);
    }

    /// Return to Idle once no task is registered, queued, or running
    pub(crate) fn finish_if_drained(&self, state: &mut RunState) {
        if state.phase != RunPhase::Running
            || !state.registry.is_empty()
            || !state.pending.is_empty()
            || !state.workers.is_empty()
        {
            return;
        }

        self.set_phase(state, RunPhase::Idle);
        let progress = state.progress.snapshot();
        tracing::info!(
            total = progress.total,
            succeeded = progress.succeeded,
            failed = progress.failed,
            canceled = progress.canceled,
            "Fetch run finished"
        );
        self.emit_event(Event::RunFinished { progress });
    }
}
