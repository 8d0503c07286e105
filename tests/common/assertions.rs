//! Event-driven waiting helpers for integration tests

use std::time::Duration;

use saved_articles::{BatchProgress, Event, SavedArticlesFetcher};
use tokio::sync::broadcast::error::RecvError;

/// Everything observed during one run, in order
#[derive(Debug, Default)]
pub struct RunRecord {
    /// All events received, including the final `RunFinished`
    pub events: Vec<Event>,
    /// Progress carried by `RunFinished`
    pub finished: Option<BatchProgress>,
}

impl RunRecord {
    /// Number of `ItemFetched` events
    pub fn fetched(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::ItemFetched { .. }))
            .count()
    }

    /// Number of `ItemFailed` events
    pub fn failed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::ItemFailed { .. }))
            .count()
    }
}

/// Collect events from `fetcher` until a run finishes or `timeout` elapses
///
/// Subscribe before starting the run, or early events are missed: pass the receiver
/// obtained from `fetcher.subscribe()`.
pub async fn collect_run(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    timeout: Duration,
) -> RunRecord {
    let mut record = RunRecord::default();

    let _ = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::RunFinished { progress }) => {
                    record.events.push(Event::RunFinished {
                        progress: progress.clone(),
                    });
                    record.finished = Some(progress);
                    return;
                }
                Ok(event) => record.events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            }
        }
    })
    .await;

    record
}

/// Assert the fetcher is idle and its last run completed
pub fn assert_run_complete(fetcher: &SavedArticlesFetcher) -> BatchProgress {
    let progress = fetcher.progress();
    assert_eq!(fetcher.phase(), saved_articles::RunPhase::Idle);
    assert!(progress.is_complete(), "run incomplete: {:?}", progress);
    assert_eq!(progress.fraction, 1.0);
    progress
}
