//! SQL schema and forward-only migrations.

use rusqlite::Connection;

use super::{Result, StoreError};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS trends (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    image         TEXT NOT NULL,
    description   TEXT,
    link          TEXT NOT NULL,
    source        TEXT NOT NULL,
    video         TEXT,
    discovered_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trends_discovered ON trends(discovered_at DESC);

CREATE TABLE IF NOT EXISTS votes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    trend_id   TEXT NOT NULL REFERENCES trends(id) ON DELETE CASCADE,
    voter_key  TEXT NOT NULL,
    vote_type  TEXT NOT NULL CHECK (vote_type IN ('like', 'dislike')),
    cast_at    INTEGER NOT NULL,
    CONSTRAINT unique_vote_per_voter UNIQUE (trend_id, voter_key)
);

CREATE INDEX IF NOT EXISTS idx_votes_trend ON votes(trend_id);
"#;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current == 0 {
        tracing::info!("initializing trend store schema v{SCHEMA_VERSION}");
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database version {current} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}
