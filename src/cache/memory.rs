//! In-memory article cache

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::LocalCache;
use crate::error::Result;
use crate::types::{ArticleContent, ArticleId};

/// Keeps fetched articles in a map for the lifetime of the process
#[derive(Default)]
pub struct MemoryCache {
    articles: RwLock<HashMap<ArticleId, ArticleContent>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stored article
    pub async fn get(&self, id: &ArticleId) -> Option<ArticleContent> {
        self.articles.read().await.get(id).cloned()
    }

    /// Drop a stored article; returns true if it was present
    pub async fn remove(&self, id: &ArticleId) -> bool {
        self.articles.write().await.remove(id).is_some()
    }

    /// Number of stored articles
    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    /// Returns true if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn has(&self, id: &ArticleId) -> Result<bool> {
        Ok(self.articles.read().await.contains_key(id))
    }

    async fn store(&self, article: &ArticleContent) -> Result<()> {
        self.articles
            .write()
            .await
            .insert(article.id.clone(), article.clone());
        Ok(())
    }
}
