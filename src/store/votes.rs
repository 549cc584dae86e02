//! Vote table queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection};

use super::{to_micros, Result, StoreError};
use crate::votes::{VoteCounts, VoteType};

/// Insert a vote and read back the trend's counts in one transaction.
pub fn insert(
    conn: &mut Connection,
    trend_id: &str,
    voter_key: &str,
    vote_type: VoteType,
    cast_at: DateTime<Utc>,
) -> Result<VoteCounts> {
    let tx = conn.transaction()?;
    let inserted = tx.execute(
        "INSERT INTO votes (trend_id, voter_key, vote_type, cast_at) VALUES (?1, ?2, ?3, ?4)",
        params![trend_id, voter_key, vote_type.as_str(), to_micros(cast_at)],
    );
    if let Err(e) = inserted {
        return Err(classify(e, trend_id, voter_key));
    }
    let counts = counts_for(&tx, trend_id)?;
    tx.commit()?;
    Ok(counts)
}

/// Map constraint failures onto domain errors.
fn classify(e: rusqlite::Error, trend_id: &str, voter_key: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        match err.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return StoreError::Conflict(format!("{voter_key} already voted on {trend_id}"));
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return StoreError::NotFound(format!("trend {trend_id}"));
            }
            _ => {}
        }
    }
    StoreError::Sqlite(e)
}

pub fn counts_for(conn: &Connection, trend_id: &str) -> Result<VoteCounts> {
    let mut stmt = conn.prepare(
        "SELECT vote_type, COUNT(*) FROM votes WHERE trend_id = ?1 GROUP BY vote_type",
    )?;
    let rows = stmt.query_map([trend_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;

    let mut counts = VoteCounts::default();
    for row in rows {
        let (kind, n) = row?;
        if let Ok(vt) = kind.parse::<VoteType>() {
            counts.add(vt, n as u64);
        }
    }
    Ok(counts)
}

/// Counts grouped by `(trend_id, vote_type)`.
pub fn all_counts(conn: &Connection) -> Result<HashMap<String, VoteCounts>> {
    let mut stmt = conn.prepare(
        "SELECT trend_id, vote_type, COUNT(*) FROM votes GROUP BY trend_id, vote_type",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
        ))
    })?;

    let mut out: HashMap<String, VoteCounts> = HashMap::new();
    for row in rows {
        let (trend_id, kind, n) = row?;
        if let Ok(vt) = kind.parse::<VoteType>() {
            out.entry(trend_id).or_default().add(vt, n as u64);
        }
    }
    Ok(out)
}
