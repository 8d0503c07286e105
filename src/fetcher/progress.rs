//! Batch progress aggregation.

use std::collections::HashMap;

use crate::error::FetchError;
use crate::types::{ArticleId, BatchProgress, TaskOutcome, TaskState};

/// Completion counters for one batch run
///
/// The total can grow while the run is active (articles saved mid-run), so the raw
/// `completed / total` ratio can dip. The reported fraction never drops below the last
/// one reported after a terminal event in the same run, and only reaches 1.0 once every
/// admitted fetch is terminal.
#[derive(Debug, Default)]
pub(crate) struct ProgressAggregator {
    total: usize,
    succeeded: usize,
    failed: usize,
    canceled: usize,
    last_error: Option<FetchError>,
    /// Highest fraction reported by a terminal event this run
    floor: f64,
    /// Terminal state of each article's latest fetch this run
    finished: HashMap<ArticleId, TaskState>,
}

impl ProgressAggregator {
    /// Start a new run expecting `total` fetches
    pub(crate) fn reset(&mut self, total: usize) {
        *self = Self {
            total,
            ..Self::default()
        };
    }

    /// Admit `n` more fetches into the current run
    pub(crate) fn extend(&mut self, n: usize) {
        self.total += n;
    }

    /// Count a terminal outcome; returns the snapshot after it
    pub(crate) fn record_terminal(&mut self, id: &ArticleId, outcome: &TaskOutcome) -> BatchProgress {
        match outcome {
            TaskOutcome::Succeeded { .. } => self.succeeded += 1,
            TaskOutcome::Failed { error } => {
                self.failed += 1;
                self.last_error = Some(error.clone());
            }
            TaskOutcome::Canceled => self.canceled += 1,
        }
        self.finished.insert(id.clone(), outcome.state());

        if self.completed() > self.total {
            tracing::warn!(
                article = %id,
                completed = self.completed(),
                total = self.total,
                "More terminal outcomes than admitted fetches"
            );
            self.total = self.completed();
        }

        self.floor = self.fraction();
        self.snapshot()
    }

    pub(crate) fn finished_state(&self, id: &ArticleId) -> Option<TaskState> {
        self.finished.get(id).copied()
    }

    pub(crate) fn completed(&self) -> usize {
        self.succeeded + self.failed + self.canceled
    }

    fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let raw = self.completed() as f64 / self.total as f64;
        raw.max(self.floor)
    }

    pub(crate) fn snapshot(&self) -> BatchProgress {
        BatchProgress {
            total: self.total,
            completed: self.completed(),
            succeeded: self.succeeded,
            failed: self.failed,
            canceled: self.canceled,
            fraction: self.fraction(),
            last_error: self.last_error.clone(),
        }
    }
}
