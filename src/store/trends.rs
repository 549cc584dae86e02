//! Trend table queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};

use super::{from_micros, to_micros, Result};
use crate::trend::Trend;

/// Keep `IN (...)` lists below SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

const SELECT_COLUMNS: &str =
    "SELECT id, title, image, description, link, source, video, discovered_at FROM trends";

fn row_to_trend(row: &Row<'_>) -> rusqlite::Result<Trend> {
    Ok(Trend {
        id: row.get(0)?,
        title: row.get(1)?,
        image: row.get(2)?,
        description: row.get(3)?,
        link: row.get(4)?,
        source: row.get(5)?,
        video: row.get(6)?,
        discovered_at: from_micros(row.get::<_, i64>(7)?),
    })
}

/// Load rows whose id is in `ids`.
pub fn load_by_ids(conn: &Connection, ids: &[String]) -> Result<HashMap<String, Trend>> {
    let mut out = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("{SELECT_COLUMNS} WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), row_to_trend)?;
        for row in rows {
            let t = row?;
            out.insert(t.id.clone(), t);
        }
    }
    Ok(out)
}

/// Most recently discovered rows first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<Trend>> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY discovered_at DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit as i64], row_to_trend)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert or refresh every row in one transaction. On any error the
/// transaction is dropped, which rolls it back.
pub fn upsert_batch(conn: &mut Connection, batch: &[Trend]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO trends (id, title, image, description, link, source, video, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 title       = excluded.title,
                 image       = excluded.image,
                 description = excluded.description,
                 link        = excluded.link,
                 source      = excluded.source,
                 video       = excluded.video",
        )?;
        for t in batch {
            stmt.execute(params![
                t.id,
                t.title,
                t.image,
                t.description,
                t.link,
                t.source,
                t.video,
                to_micros(t.discovered_at),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn delete_older_than(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM trends WHERE discovered_at < ?1",
        [to_micros(cutoff)],
    )?;
    Ok(n)
}

pub fn count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM trends", [], |r| r.get(0))?;
    Ok(n as usize)
}
