//! In-memory saved page list with a change feed.
//!
//! The list itself is owned by the embedding application; the fetch pipeline only reads
//! it and follows its [`SavedListEvent`] feed. This implementation backs tests and simple
//! embeddings that keep the list in memory.

use std::collections::HashSet;

use tokio::sync::{RwLock, broadcast};

use crate::types::ArticleId;

/// Capacity of the change feed before slow subscribers start lagging
const LIST_EVENT_BUFFER: usize = 256;

/// Change to the saved page list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SavedListEvent {
    /// Article appended to the list
    Added(ArticleId),
    /// Article removed from the list
    Removed(ArticleId),
    /// Whole list replaced with a new snapshot
    Replaced(Vec<ArticleId>),
}

#[derive(Default)]
struct Entries {
    order: Vec<ArticleId>,
    members: HashSet<ArticleId>,
}

impl Entries {
    fn from_ids(ids: impl IntoIterator<Item = ArticleId>) -> Self {
        let mut entries = Self::default();
        for id in ids {
            if entries.members.insert(id.clone()) {
                entries.order.push(id);
            }
        }
        entries
    }
}

/// Ordered, duplicate-free list of articles the user wants available offline
pub struct SavedPageList {
    entries: RwLock<Entries>,
    events: broadcast::Sender<SavedListEvent>,
}

impl Default for SavedPageList {
    fn default() -> Self {
        Self::new()
    }
}

impl SavedPageList {
    /// Create an empty list
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(LIST_EVENT_BUFFER);
        Self {
            entries: RwLock::new(Entries::default()),
            events,
        }
    }

    /// Create a list pre-filled with `ids` (duplicates dropped, order kept)
    pub fn with_entries(ids: impl IntoIterator<Item = ArticleId>) -> Self {
        let (events, _rx) = broadcast::channel(LIST_EVENT_BUFFER);
        Self {
            entries: RwLock::new(Entries::from_ids(ids)),
            events,
        }
    }

    /// Append an article; returns false if it was already saved
    pub async fn add(&self, id: ArticleId) -> bool {
        let mut entries = self.entries.write().await;
        if !entries.members.insert(id.clone()) {
            return false;
        }
        entries.order.push(id.clone());
        self.events.send(SavedListEvent::Added(id)).ok();
        true
    }

    /// Remove an article; returns false if it was not saved
    pub async fn remove(&self, id: &ArticleId) -> bool {
        let mut entries = self.entries.write().await;
        if !entries.members.remove(id) {
            return false;
        }
        entries.order.retain(|existing| existing != id);
        self.events.send(SavedListEvent::Removed(id.clone())).ok();
        true
    }

    /// Replace the whole list (duplicates dropped, order kept)
    pub async fn replace(&self, ids: impl IntoIterator<Item = ArticleId>) {
        let next = Entries::from_ids(ids);
        let snapshot = next.order.clone();
        let mut entries = self.entries.write().await;
        *entries = next;
        self.events.send(SavedListEvent::Replaced(snapshot)).ok();
    }

    /// Returns true if the article is saved
    pub async fn contains(&self, id: &ArticleId) -> bool {
        self.entries.read().await.members.contains(id)
    }

    /// Current contents in insertion order
    pub async fn snapshot(&self) -> Vec<ArticleId> {
        self.entries.read().await.order.clone()
    }

    /// Number of saved articles
    pub async fn len(&self) -> usize {
        self.entries.read().await.order.len()
    }

    /// Returns true if nothing is saved
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.order.is_empty()
    }

    /// Subscribe to list changes
    pub fn subscribe(&self) -> broadcast::Receiver<SavedListEvent> {
        self.events.subscribe()
    }
}
