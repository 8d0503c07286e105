//! In-flight registry: at most one fetch task per article.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;

use crate::types::{ArticleId, TaskState};

/// Bookkeeping for one pending or running fetch
#[derive(Debug, Clone)]
pub(crate) struct FetchTask {
    /// Unique per fetcher; tells a late report from a canceled task apart from a newer task
    pub(crate) seq: u64,
    /// Pending or Running
    pub(crate) state: TaskState,
    /// Signals the worker to stop
    pub(crate) cancel: CancellationToken,
}

/// Maps each article to its single active fetch task
///
/// Not synchronized on its own: it lives inside the fetcher's run-state lock, which
/// serializes worker completions against list-change handling.
#[derive(Debug, Default)]
pub(crate) struct InFlightRegistry {
    tasks: HashMap<ArticleId, FetchTask>,
    next_seq: u64,
}

impl InFlightRegistry {
    /// Register `id` as pending; returns false (and changes nothing) if it already is in flight
    pub(crate) fn try_begin(&mut self, id: &ArticleId) -> bool {
        if self.tasks.contains_key(id) {
            return false;
        }
        self.next_seq += 1;
        self.tasks.insert(
            id.clone(),
            FetchTask {
                seq: self.next_seq,
                state: TaskState::Pending,
                cancel: CancellationToken::new(),
            },
        );
        true
    }

    /// Move the task `seq` for `id` from Pending to Running
    pub(crate) fn mark_running(&mut self, id: &ArticleId, seq: u64) -> bool {
        match self.tasks.get_mut(id) {
            Some(task) if task.seq == seq => {
                task.state = TaskState::Running;
                true
            }
            _ => false,
        }
    }

    /// Remove `id` unconditionally, returning its task if there was one
    pub(crate) fn end(&mut self, id: &ArticleId) -> Option<FetchTask> {
        self.tasks.remove(id)
    }

    /// Remove `id` only if its current task is `seq`
    pub(crate) fn end_if(&mut self, id: &ArticleId, seq: u64) -> bool {
        if self.tasks.get(id).is_some_and(|task| task.seq == seq) {
            self.tasks.remove(id);
            return true;
        }
        false
    }

    pub(crate) fn get(&self, id: &ArticleId) -> Option<&FetchTask> {
        self.tasks.get(id)
    }

    pub(crate) fn is_in_flight(&self, id: &ArticleId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Snapshot of all registered articles, for cancellation sweeps
    pub(crate) fn all_ids(&self) -> HashSet<ArticleId> {
        self.tasks.keys().cloned().collect()
    }

    /// Snapshot of registered articles and their states
    pub(crate) fn tasks(&self) -> Vec<(ArticleId, TaskState)> {
        self.tasks
            .iter()
            .map(|(id, task)| (id.clone(), task.state))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
