use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Entity, Group, NewEntity, Post};

/// Backing-store port consumed by the refresh loop.
///
/// Rows come back in the fixed column order of their tables.
#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn fetch_all_groups(&self) -> Result<Vec<Group>>;
    async fn fetch_all_posts(&self) -> Result<Vec<Post>>;
    /// Maximum stored entity date; `None` when no entity exists
    async fn fetch_watermark(&self) -> Result<Option<NaiveDateTime>>;
    /// Posts newer than `watermark`, or all posts when it is `None`
    async fn fetch_unprocessed_posts(&self, watermark: Option<NaiveDateTime>) -> Result<Vec<Post>>;
    async fn fetch_all_entities(&self) -> Result<Vec<Entity>>;
    /// Append `rows` atomically, returning how many were written
    async fn bulk_insert_entities(&self, rows: &[NewEntity]) -> Result<usize>;
}

/// [`NewsStore`] over the pooled SQLite database.
///
/// rusqlite is blocking, so every call runs on Tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    database: Database,
}

impl SqliteStore {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || operation(&database)).await?
    }
}

#[async_trait]
impl NewsStore for SqliteStore {
    async fn fetch_all_groups(&self) -> Result<Vec<Group>> {
        self.blocking(Database::fetch_all_groups).await
    }

    async fn fetch_all_posts(&self) -> Result<Vec<Post>> {
        self.blocking(Database::fetch_all_posts).await
    }

    async fn fetch_watermark(&self) -> Result<Option<NaiveDateTime>> {
        self.blocking(Database::fetch_watermark).await
    }

    async fn fetch_unprocessed_posts(&self, watermark: Option<NaiveDateTime>) -> Result<Vec<Post>> {
        self.blocking(move |db| db.fetch_unprocessed_posts(watermark)).await
    }

    async fn fetch_all_entities(&self) -> Result<Vec<Entity>> {
        self.blocking(Database::fetch_all_entities).await
    }

    async fn bulk_insert_entities(&self, rows: &[NewEntity]) -> Result<usize> {
        let rows = rows.to_vec();
        self.blocking(move |db| db.bulk_insert_entities(&rows)).await
    }
}
