//! SQLite article cache persistence

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use saved_articles::{ArticleContent, LocalCache, SqliteCache};
use tempfile::TempDir;

fn content(title: &str, revision: Option<u64>) -> ArticleContent {
    ArticleContent {
        id: article_id(title),
        title: title.to_string(),
        html: format!("<p>{}</p>", title),
        revision,
        fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn stores_and_loads_articles() {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::open(&temp_dir.path().join("cache.db"))
        .await
        .unwrap();
    let article = content("Tardigrade", Some(1187345612));

    assert!(!cache.has(&article.id).await.unwrap());
    cache.store(&article).await.unwrap();

    assert!(cache.has(&article.id).await.unwrap());
    assert_eq!(cache.get(&article.id).await.unwrap(), Some(article));
    assert_eq!(cache.count().await.unwrap(), 1);
}

#[tokio::test]
async fn store_overwrites_previous_copy() {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::open(&temp_dir.path().join("cache.db"))
        .await
        .unwrap();

    cache.store(&content("Tardigrade", Some(1))).await.unwrap();
    cache.store(&content("Tardigrade", Some(2))).await.unwrap();

    assert_eq!(cache.count().await.unwrap(), 1);
    let stored = cache.get(&article_id("Tardigrade")).await.unwrap().unwrap();
    assert_eq!(stored.revision, Some(2));
}

#[tokio::test]
async fn remove_deletes_row() {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::open(&temp_dir.path().join("cache.db"))
        .await
        .unwrap();
    cache.store(&content("Tardigrade", None)).await.unwrap();

    assert!(cache.remove(&article_id("Tardigrade")).await.unwrap());
    assert!(!cache.remove(&article_id("Tardigrade")).await.unwrap());
    assert!(!cache.has(&article_id("Tardigrade")).await.unwrap());
}

#[tokio::test]
async fn reopening_keeps_data_and_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("cache.db");

    {
        let cache = SqliteCache::open(&db_path).await.unwrap();
        cache.store(&content("Tardigrade", Some(7))).await.unwrap();
        cache.close().await;
    }

    let reopened = SqliteCache::open(&db_path).await.unwrap();
    assert!(reopened.has(&article_id("Tardigrade")).await.unwrap());
    assert_eq!(reopened.count().await.unwrap(), 1);
}
