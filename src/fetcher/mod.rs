//! Saved-articles fetch orchestrator, split into focused submodules.
//!
//! The [`SavedArticlesFetcher`] struct and its methods are organized by concern:
//! - [`registry`] - In-flight registry (one task per article)
//! - [`progress`] - Batch progress aggregation
//! - [`adapter`] - Per-article fetch with cache short-circuit and cancellation
//! - [`control`] - Run start, article added/removed
//! - [`dispatch`] - Bounded worker dispatch and terminal-result handling
//! - [`lifecycle`] - Cancel-all, idle waiting, shutdown
//! - [`listener`] - Following a saved page list's change feed

mod adapter;
mod control;
mod dispatch;
mod lifecycle;
mod listener;
mod progress;
mod registry;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::cache::{LocalCache, SqliteCache};
use crate::config::{Config, FetchConfig};
use crate::error::Result;
use crate::source::{ContentFetcher, RestContentFetcher};
use crate::types::{ArticleId, BatchProgress, Event, RunPhase, TaskState};

use adapter::FetchAdapter;
use progress::ProgressAggregator;
use registry::InFlightRegistry;

/// A spawned fetch worker (keyed by task sequence number in [`RunState::workers`])
///
/// Owns one permit of [`SavedArticlesFetcher::slots`]; the slot frees when the entry is
/// removed, whether the worker reported back or was abandoned.
pub(crate) struct Worker {
    pub(crate) id: ArticleId,
    pub(crate) handle: tokio::task::JoinHandle<()>,
    pub(crate) _permit: OwnedSemaphorePermit,
}

/// Everything mutated while a run is in progress, guarded by one lock
///
/// Terminal handling (registry end, progress update, notification) for one article
/// happens under this lock, so it never interleaves with another article's.
#[derive(Default)]
pub(crate) struct RunState {
    /// Idle or Running
    pub(crate) phase: RunPhase,
    /// Articles with a pending or running fetch
    pub(crate) registry: InFlightRegistry,
    /// Admitted articles waiting for a free slot, oldest first, with their task sequence
    pub(crate) pending: VecDeque<(ArticleId, u64)>,
    /// Workers that have not reported back yet, including canceled ones
    pub(crate) workers: HashMap<u64, Worker>,
    /// Completion counters for the run
    pub(crate) progress: ProgressAggregator,
}

/// Downloads and persists a user's saved ("read later") articles
///
/// Cloneable - all fields are Arc-wrapped. Construct one explicitly and hand clones to
/// whoever needs to drive or observe it.
#[derive(Clone)]
pub struct SavedArticlesFetcher {
    /// Pipeline limits
    pub(crate) config: Arc<FetchConfig>,
    /// Per-article fetch logic
    pub(crate) adapter: Arc<FetchAdapter>,
    /// Local storage, consulted before admitting an article
    pub(crate) cache: Arc<dyn LocalCache>,
    /// Run state (registry, pending queue, workers, progress)
    pub(crate) state: Arc<Mutex<RunState>>,
    /// Semaphore to limit concurrent fetches (respects max_concurrent_fetches config)
    pub(crate) slots: Arc<Semaphore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Latest progress snapshot
    pub(crate) progress_tx: Arc<watch::Sender<BatchProgress>>,
    /// Current run phase
    pub(crate) phase_tx: Arc<watch::Sender<RunPhase>>,
    /// Cleared on shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Fired on shutdown; stops list listeners
    pub(crate) shutdown_token: CancellationToken,
}

impl SavedArticlesFetcher {
    /// Create a fetcher from explicit collaborators
    ///
    /// `source` is the content strategy used for every article; `cache` is consulted
    /// before each fetch and receives every fetched article.
    pub fn new(
        config: FetchConfig,
        source: Arc<dyn ContentFetcher>,
        cache: Arc<dyn LocalCache>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(config.event_buffer);
        let (progress_tx, _) = watch::channel(BatchProgress::default());
        let (phase_tx, _) = watch::channel(RunPhase::Idle);

        tracing::info!(
            source = source.name(),
            max_concurrent_fetches = config.max_concurrent_fetches,
            "Saved articles fetcher initialized"
        );

        Ok(Self {
            adapter: Arc::new(FetchAdapter::new(source, cache.clone())),
            cache,
            state: Arc::new(Mutex::new(RunState::default())),
            slots: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            config: Arc::new(config),
            event_tx,
            progress_tx: Arc::new(progress_tx),
            phase_tx: Arc::new(phase_tx),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Create a fetcher backed by the REST content source and the SQLite cache
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(RestContentFetcher::new(&config.source)?);
        let cache = Arc::new(SqliteCache::open(&config.cache.database_path).await?);

        Self::new(config.fetch.clone(), source, cache)
    }

    /// Subscribe to pipeline events
    ///
    /// Each subscriber receives all events independently, on whatever task it reads
    /// them from. A subscriber that falls more than `event_buffer` events behind receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Pipeline events as a stream; lagged gaps are skipped with a warning
    pub fn event_stream(&self) -> impl Stream<Item = Event> + Send + 'static {
        BroadcastStream::new(self.event_tx.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "Event stream subscriber lagged");
                None
            }
        })
    }

    /// Progress subscription that always holds the latest snapshot
    pub fn watch_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress_tx.subscribe()
    }

    /// Point-in-time progress of the current (or last) run
    pub fn progress(&self) -> BatchProgress {
        self.progress_tx.borrow().clone()
    }

    /// Whether a run is active
    pub fn phase(&self) -> RunPhase {
        *self.phase_tx.borrow()
    }

    /// Pipeline limits this fetcher was built with
    pub fn config(&self) -> Arc<FetchConfig> {
        Arc::clone(&self.config)
    }

    /// Returns true if `id` has a pending or running fetch
    pub async fn is_in_flight(&self, id: &ArticleId) -> bool {
        self.state.lock().await.registry.is_in_flight(id)
    }

    /// Pending and running fetches, sorted by identifier
    pub async fn in_flight(&self) -> Vec<(ArticleId, TaskState)> {
        let mut tasks = self.state.lock().await.registry.tasks();
        tasks.sort_by(|a, b| a.0.cmp(&b.0));
        tasks
    }

    /// Where `id` stands in the current run
    ///
    /// Pending or Running while a fetch is in flight; otherwise the terminal state of its
    /// last fetch in this run, or None if the run never admitted it.
    pub async fn task_state(&self, id: &ArticleId) -> Option<TaskState> {
        let state = self.state.lock().await;
        state
            .registry
            .get(id)
            .map(|task| task.state)
            .or_else(|| state.progress.finished_state(id))
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Publish the aggregator's snapshot to watchers and event subscribers
    pub(crate) fn publish_progress(&self, state: &RunState) -> BatchProgress {
        let snapshot = state.progress.snapshot();
        self.progress_tx.send_replace(snapshot.clone());
        self.emit_event(Event::Progress {
            progress: snapshot.clone(),
        });
        snapshot
    }

    /// Record a phase change in the run state and publish it
    pub(crate) fn set_phase(&self, state: &mut RunState, phase: RunPhase) {
        state.phase = phase;
        self.phase_tx.send_replace(phase);
    }
}
