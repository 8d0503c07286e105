//! Shared test helpers for driving a SavedArticlesFetcher with controllable collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::cache::{LocalCache, MemoryCache};
use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use crate::fetcher::SavedArticlesFetcher;
use crate::source::ContentFetcher;
use crate::types::{ArticleContent, ArticleId, Event};

/// Upper bound for anything a test waits on
pub(crate) const WAIT: Duration = Duration::from_secs(5);

pub(crate) fn id(title: &str) -> ArticleId {
    ArticleId::parse(&format!("https://en.wikipedia.org/wiki/{}", title)).unwrap()
}

pub(crate) fn article(title: &str) -> ArticleContent {
    ArticleContent {
        id: id(title),
        title: title.to_string(),
        html: format!("<p>{}</p>", title),
        revision: Some(1),
        fetched_at: Utc::now(),
    }
}

/// Content source that records calls and can hold each fetch until released
///
/// It ignores its cancellation token, like a source blocked in I/O.
pub(crate) struct GatedSource {
    gated: bool,
    calls: Mutex<Vec<ArticleId>>,
    gates: Mutex<HashMap<ArticleId, Arc<Notify>>>,
    failures: Mutex<HashMap<ArticleId, FetchError>>,
    dispatched_tx: mpsc::UnboundedSender<ArticleId>,
    dispatched_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ArticleId>>,
}

impl GatedSource {
    /// Source that answers immediately
    pub(crate) fn new() -> Self {
        Self::build(false)
    }

    /// Source whose fetches block until [`release`](Self::release)d
    pub(crate) fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        let (dispatched_tx, dispatched_rx) = mpsc::unbounded_channel();
        Self {
            gated,
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            dispatched_tx,
            dispatched_rx: tokio::sync::Mutex::new(dispatched_rx),
        }
    }

    fn gate(&self, id: &ArticleId) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Let the blocked (or next) fetch of `id` finish
    pub(crate) fn release(&self, id: &ArticleId) {
        self.gate(id).notify_one();
    }

    /// Make fetches of `id` fail with `error`
    pub(crate) fn fail_with(&self, id: &ArticleId, error: FetchError) {
        self.failures.lock().unwrap().insert(id.clone(), error);
    }

    pub(crate) fn call_count(&self, id: &ArticleId) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Wait for the next fetch to reach the source
    pub(crate) async fn next_dispatched(&self) -> ArticleId {
        let mut rx = self.dispatched_rx.lock().await;
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a fetch to start")
            .expect("source channel closed")
    }

    /// Returns the next dispatched fetch if one arrives within `within`
    pub(crate) async fn try_next_dispatched(&self, within: Duration) -> Option<ArticleId> {
        let mut rx = self.dispatched_rx.lock().await;
        tokio::time::timeout(within, rx.recv()).await.ok().flatten()
    }
}

#[async_trait]
impl ContentFetcher for GatedSource {
    async fn fetch(
        &self,
        id: &ArticleId,
        _cancel: &CancellationToken,
    ) -> std::result::Result<ArticleContent, FetchError> {
        self.calls.lock().unwrap().push(id.clone());
        self.dispatched_tx.send(id.clone()).ok();

        if self.gated {
            self.gate(id).notified().await;
        }

        let failure = self.failures.lock().unwrap().get(id).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(ArticleContent {
                id: id.clone(),
                title: id.title().unwrap_or_default(),
                html: format!("<p>{}</p>", id),
                revision: Some(1),
                fetched_at: Utc::now(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Cache whose `store` never completes
pub(crate) struct StallingCache;

#[async_trait]
impl LocalCache for StallingCache {
    async fn has(&self, _id: &ArticleId) -> Result<bool> {
        Ok(false)
    }

    async fn store(&self, _article: &ArticleContent) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Cache whose `store` never completes for one article; everything else is kept in memory
pub(crate) struct StallOnCache {
    stalled: ArticleId,
    inner: MemoryCache,
}

impl StallOnCache {
    pub(crate) fn new(stalled: ArticleId) -> Self {
        Self {
            stalled,
            inner: MemoryCache::new(),
        }
    }

    pub(crate) async fn get(&self, id: &ArticleId) -> Option<ArticleContent> {
        self.inner.get(id).await
    }
}

#[async_trait]
impl LocalCache for StallOnCache {
    async fn has(&self, id: &ArticleId) -> Result<bool> {
        self.inner.has(id).await
    }

    async fn store(&self, article: &ArticleContent) -> Result<()> {
        if article.id == self.stalled {
            std::future::pending::<()>().await;
        }
        self.inner.store(article).await
    }
}

/// Cache whose lookups never complete
pub(crate) struct StallingLookupCache;

#[async_trait]
impl LocalCache for StallingLookupCache {
    async fn has(&self, _id: &ArticleId) -> Result<bool> {
        std::future::pending::<()>().await;
        Ok(false)
    }

    async fn store(&self, _article: &ArticleContent) -> Result<()> {
        Ok(())
    }
}

/// Cache that cannot store anything
pub(crate) struct FailingCache;

#[async_trait]
impl LocalCache for FailingCache {
    async fn has(&self, _id: &ArticleId) -> Result<bool> {
        Ok(false)
    }

    async fn store(&self, _article: &ArticleContent) -> Result<()> {
        Err(Error::Other("disk full".to_string()))
    }
}

/// Fetcher plus handles on its collaborators
pub(crate) struct TestFetcher {
    pub(crate) fetcher: SavedArticlesFetcher,
    pub(crate) source: Arc<GatedSource>,
    pub(crate) cache: Arc<MemoryCache>,
}

/// Fetcher over a gated source and an in-memory cache
pub(crate) fn create_test_fetcher(max_concurrent_fetches: usize) -> TestFetcher {
    create_fetcher_with(max_concurrent_fetches, GatedSource::gated())
}

/// Fetcher over a source that answers immediately
pub(crate) fn create_ungated_fetcher(max_concurrent_fetches: usize) -> TestFetcher {
    create_fetcher_with(max_concurrent_fetches, GatedSource::new())
}

fn create_fetcher_with(max_concurrent_fetches: usize, source: GatedSource) -> TestFetcher {
    let source = Arc::new(source);
    let cache = Arc::new(MemoryCache::new());
    let config = FetchConfig {
        max_concurrent_fetches,
        cancel_timeout: Duration::from_secs(2),
        ..FetchConfig::default()
    };
    let fetcher = SavedArticlesFetcher::new(config, source.clone(), cache.clone()).unwrap();
    TestFetcher {
        fetcher,
        source,
        cache,
    }
}

/// Receive events until one matches `predicate`, returning it
pub(crate) async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    predicate: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Drain events already delivered to `rx`
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
