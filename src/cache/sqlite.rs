//! SQLite-backed article cache.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{FromRow, SqliteConnection};

use super::LocalCache;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{ArticleContent, ArticleId};

/// Stored article row
#[derive(Debug, Clone, FromRow)]
struct ArticleRow {
    url: String,
    title: String,
    html: String,
    revision: Option<i64>,
    fetched_at: i64,
}

impl ArticleRow {
    fn into_content(self) -> Result<ArticleContent> {
        Ok(ArticleContent {
            id: ArticleId::parse(&self.url)?,
            title: self.title,
            html: self.html,
            revision: self.revision.and_then(|r| u64::try_from(r).ok()),
            fetched_at: DateTime::from_timestamp(self.fetched_at, 0).unwrap_or_default(),
        })
    }
}

/// Article cache stored in a SQLite database
#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database at `path` and run migrations
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let cache = Self { pool };
        cache.run_migrations().await?;

        tracing::debug!(path = %path.display(), "Article cache opened");
        Ok(cache)
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Load a stored article
    pub async fn get(&self, id: &ArticleId) -> Result<Option<ArticleContent>> {
        let row: Option<ArticleRow> = sqlx::query_as(
            "SELECT url, title, html, revision, fetched_at FROM saved_articles WHERE url = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load article: {}",
                e
            )))
        })?;

        row.map(ArticleRow::into_content).transpose()
    }

    /// Delete a stored article; returns true if a row was removed
    pub async fn remove(&self, id: &ArticleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_articles WHERE url = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete article: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored articles
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_articles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count articles: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?;

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: saved_articles table
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying article cache migration v1");

        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            sqlx::query(
                r#"
                CREATE TABLE saved_articles (
                    url TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    html TEXT NOT NULL,
                    revision INTEGER,
                    fetched_at INTEGER NOT NULL
                )
                "#,
            )
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to create saved_articles table: {}",
                    e
                )))
            })?;

            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
                .bind(1_i64)
                .bind(Utc::now().timestamp())
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::MigrationFailed(format!(
                        "Failed to record migration v1: {}",
                        e
                    )))
                })?;

            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Article cache migration v1 complete");
        Ok(())
    }
}

#[async_trait]
impl LocalCache for SqliteCache {
    async fn has(&self, id: &ArticleId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM saved_articles WHERE url = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to check article: {}",
                    e
                )))
            })?;

        Ok(found.is_some())
    }

    async fn store(&self, article: &ArticleContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO saved_articles (url, title, html, revision, fetched_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                html = excluded.html,
                revision = excluded.revision,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(article.id.as_str())
        .bind(&article.title)
        .bind(&article.html)
        .bind(article.revision.and_then(|r| i64::try_from(r).ok()))
        .bind(article.fetched_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store article: {}",
                e
            )))
        })?;

        Ok(())
    }
}
