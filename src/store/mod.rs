//! # Store
//!
//! Persistence for trends and votes, backed by a single SQLite database.
//!
//! - WAL mode, foreign keys enforced
//! - Timestamps stored as Unix epoch microseconds (i64)
//! - Schema version kept in `PRAGMA user_version`
//!
//! Callers talk to the [`TrendStore`] and [`VoteStore`] traits; [`SqliteStore`]
//! implements both and runs every query on the blocking pool.

pub mod schema;
pub mod trends;
pub mod votes;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::trend::Trend;
use crate::votes::{VoteCounts, VoteType};

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persisted trend table, keyed by content-derived id.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Rows whose id is in `ids`, keyed by id. Unknown ids are simply absent.
    async fn load_by_ids(&self, ids: Vec<String>) -> Result<HashMap<String, Trend>>;

    /// Insert new rows and refresh display fields of existing ones in one
    /// transaction. `discovered_at` of an existing row is never overwritten.
    async fn upsert_batch(&self, trends: Vec<Trend>) -> Result<()>;

    /// Delete rows discovered before `cutoff`. Returns the number removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Up to `limit` rows, most recently discovered first.
    async fn recent(&self, limit: usize) -> Result<Vec<Trend>>;

    async fn count(&self) -> Result<usize>;
}

/// Votes with a storage-level `(trend_id, voter_key)` uniqueness constraint.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Insert a vote and return the trend's updated counts, atomically.
    /// A second vote for the same pair fails with [`StoreError::Conflict`];
    /// an unknown trend fails with [`StoreError::NotFound`].
    async fn insert_vote(
        &self,
        trend_id: String,
        voter_key: String,
        vote_type: VoteType,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteCounts>;

    async fn counts_for(&self, trend_id: String) -> Result<VoteCounts>;

    /// Counts for every trend that has at least one vote.
    async fn all_counts(&self) -> Result<HashMap<String, VoteCounts>>;
}

/// SQLite-backed implementation of both stores.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`, applying pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Timestamps round-trip through storage at microsecond precision.
pub fn storage_precision(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t.timestamp_micros()).unwrap_or(t)
}

pub(crate) fn to_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

pub(crate) fn from_micros(v: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(v).unwrap_or_default()
}

#[async_trait]
impl TrendStore for SqliteStore {
    async fn load_by_ids(&self, ids: Vec<String>) -> Result<HashMap<String, Trend>> {
        self.with_conn(move |conn| trends::load_by_ids(conn, &ids))
            .await
    }

    async fn upsert_batch(&self, batch: Vec<Trend>) -> Result<()> {
        self.with_conn(move |conn| trends::upsert_batch(conn, &batch))
            .await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn(move |conn| trends::delete_older_than(conn, cutoff))
            .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Trend>> {
        self.with_conn(move |conn| trends::list_recent(conn, limit))
            .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| trends::count(conn)).await
    }
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn insert_vote(
        &self,
        trend_id: String,
        voter_key: String,
        vote_type: VoteType,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteCounts> {
        self.with_conn(move |conn| votes::insert(conn, &trend_id, &voter_key, vote_type, cast_at))
            .await
    }

    async fn counts_for(&self, trend_id: String) -> Result<VoteCounts> {
        self.with_conn(move |conn| votes::counts_for(conn, &trend_id))
            .await
    }

    async fn all_counts(&self) -> Result<HashMap<String, VoteCounts>> {
        self.with_conn(|conn| votes::all_counts(conn)).await
    }
}
