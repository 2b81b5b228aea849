use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{Entity, Group, NewEntity, Post};
use crate::schema::{entities, groups, posts};

/// Pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;
/// Connection checked out of [`DbPool`]
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
///
/// Cloning is cheap: clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `database_url` with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_config(&DatabaseConfig {
            url: database_url.to_string(),
            ..DatabaseConfig::default()
        })
    }

    /// Open (or create) the database described by `config`
    pub fn with_config(config: &DatabaseConfig) -> Result<Self> {
        let path = sqlite_path(&config.url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Foreign keys are per-connection in SQLite
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        debug!(path, "Database ready");
        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2026-10-01-000000_create_tables/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// All groups, in storage order
    pub fn fetch_all_groups(&self) -> Result<Vec<Group>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {} FROM {}",
            groups::GROUP_ID,
            groups::SCREEN_NAME,
            groups::NAME,
            groups::MEMBERS_COUNT,
            groups::TABLE
        ))?;
        let rows = stmt.query_map([], map_group)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All posts, in storage order
    pub fn fetch_all_posts(&self) -> Result<Vec<Post>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM {}", post_columns(), posts::TABLE))?;
        let rows = stmt.query_map([], map_post)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Latest entity date, or `None` when no entity has been stored yet.
    ///
    /// Dates are compared through `julianday` so that `T`- and
    /// space-separated timestamps order by time rather than as text.
    pub fn fetch_watermark(&self) -> Result<Option<NaiveDateTime>> {
        let conn = self.get_connection()?;
        let watermark = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} ORDER BY julianday({}) DESC LIMIT 1",
                    entities::DATE,
                    entities::TABLE,
                    entities::DATE
                ),
                [],
                |row| row.get::<_, NaiveDateTime>(0),
            )
            .optional()?;
        Ok(watermark)
    }

    /// Posts dated strictly after `watermark`; every post when there is none
    pub fn fetch_unprocessed_posts(&self, watermark: Option<NaiveDateTime>) -> Result<Vec<Post>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE ?1 IS NULL OR julianday({}) > julianday(?1) ORDER BY julianday({}) ASC",
            post_columns(),
            posts::TABLE,
            posts::DATE,
            posts::DATE
        ))?;
        let rows = stmt.query_map(params![watermark], map_post)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All entities, in storage order
    pub fn fetch_all_entities(&self) -> Result<Vec<Entity>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {} FROM {}",
            entities::POST_ID,
            entities::TYPE,
            entities::DATE,
            entities::ENTITY,
            entities::TABLE
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(Entity {
                post_id: row.get(0)?,
                entity_type: row.get(1)?,
                date: row.get(2)?,
                text: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Append entities in one transaction.
    ///
    /// Either every row is written or, on any failure, none is.
    pub fn bulk_insert_entities(&self, rows: &[NewEntity]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                entities::TABLE,
                entities::POST_ID,
                entities::TYPE,
                entities::DATE,
                entities::ENTITY
            ))?;
            for entity in rows {
                // An early return drops `tx`, which rolls back
                stmt.execute(params![entity.post_id, entity.entity_type, entity.date, entity.text])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Insert or replace groups. Used by seeding and tests; ingestion is external.
    pub fn upsert_groups(&self, rows: &[Group]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                groups::TABLE,
                groups::GROUP_ID,
                groups::SCREEN_NAME,
                groups::NAME,
                groups::MEMBERS_COUNT
            ))?;
            for group in rows {
                stmt.execute(params![
                    group.group_id,
                    group.screen_name,
                    group.name,
                    group.members_count
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Insert or replace posts. Used by seeding and tests; ingestion is external.
    pub fn upsert_posts(&self, rows: &[Post]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                posts::TABLE,
                post_columns()
            ))?;
            for post in rows {
                stmt.execute(params![
                    post.post_id,
                    post.group,
                    post.date,
                    post.title,
                    post.text,
                    post.likes_count,
                    post.views_count,
                    post.comments_count,
                    post.reposts_count
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Row counts per table
    pub fn get_table_stats(&self) -> Result<TableStats> {
        let conn = self.get_connection()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        };

        Ok(TableStats {
            groups: usize::try_from(count(groups::TABLE)?).unwrap_or_default(),
            posts: usize::try_from(count(posts::TABLE)?).unwrap_or_default(),
            entities: usize::try_from(count(entities::TABLE)?).unwrap_or_default(),
        })
    }
}

/// Row counts of the backing tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Rows in `groups`
    pub groups: usize,
    /// Rows in `posts`
    pub posts: usize,
    /// Rows in `entities`
    pub entities: usize,
}

/// Strip an optional `sqlite:` / `sqlite://` scheme from a database URL
#[must_use]
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

fn post_columns() -> String {
    [
        posts::POST_ID,
        posts::GROUP,
        posts::DATE,
        posts::TITLE,
        posts::TEXT,
        posts::LIKES_COUNT,
        posts::VIEWS_COUNT,
        posts::COMMENTS_COUNT,
        posts::REPOSTS_COUNT,
    ]
    .join(", ")
}

/// Map a database row to a Post (fixed column order)
fn map_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        post_id: row.get(0)?,
        group: row.get(1)?,
        date: row.get(2)?,
        title: row.get(3)?,
        text: row.get(4)?,
        likes_count: row.get(5)?,
        views_count: row.get(6)?,
        comments_count: row.get(7)?,
        reposts_count: row.get(8)?,
    })
}

/// Map a database row to a Group (fixed column order)
fn map_group(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        group_id: row.get(0)?,
        screen_name: row.get(1)?,
        name: row.get(2)?,
        members_count: row.get(3)?,
    })
}
