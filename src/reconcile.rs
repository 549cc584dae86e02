//! # Reconciler
//!
//! Merges a freshly collected batch against the persisted trend table.
//!
//! 1. Assign ids and drop in-batch duplicates (first occurrence wins).
//! 2. Load the persisted rows for the batch's ids.
//! 3. Known ids keep their `discovered_at` and take the newer display fields;
//!    new ids are stamped with `now`.
//! 4. Write everything back in one transaction.
//! 5. Sort newest-first and cap to the cache capacity.
//!
//! A storage failure in steps 2 or 4 does not fail the cycle: the batch is
//! served stamped with `now` (degraded mode) and the failure is logged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::identity;
use crate::ingest::types::TrendCandidate;
use crate::store::{storage_precision, TrendStore};
use crate::trend::Trend;

/// What one reconciliation pass produced.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Newest first, at most `capacity` items.
    pub trends: Vec<Trend>,
    pub inserted: usize,
    pub updated: usize,
    /// Candidates dropped because an earlier one in the batch had the same id.
    pub duplicates: usize,
    /// True when storage failed and `discovered_at` could not be preserved.
    pub degraded: bool,
}

/// Assign ids and keep the first candidate per id, in batch order.
pub fn dedup_batch(candidates: Vec<TrendCandidate>) -> (Vec<(String, TrendCandidate)>, usize) {
    let mut first_source: HashMap<String, String> = HashMap::with_capacity(candidates.len());
    let mut kept = Vec::with_capacity(candidates.len());
    let mut dropped = 0usize;

    for c in candidates {
        let id = identity::assign_id(&c);
        if let Some(kept_source) = first_source.get(&id) {
            dropped += 1;
            tracing::debug!(
                target: "reconcile",
                %id,
                kept = %kept_source,
                dropped = %c.source,
                "duplicate candidate in batch"
            );
            continue;
        }
        first_source.insert(id.clone(), c.source.clone());
        kept.push((id, c));
    }

    (kept, dropped)
}

/// Reconcile `candidates` against `store` at time `now`.
pub async fn reconcile(
    store: &dyn TrendStore,
    candidates: Vec<TrendCandidate>,
    now: DateTime<Utc>,
    capacity: usize,
) -> ReconcileOutcome {
    let now = storage_precision(now);
    let (batch, duplicates) = dedup_batch(candidates);
    counter!("reconcile_duplicates_total").increment(duplicates as u64);

    let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
    let mut known = match store.load_by_ids(ids).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(target: "reconcile", error = %e, "loading persisted trends failed; serving degraded batch");
            let trends = batch
                .into_iter()
                .map(|(id, c)| Trend::with_id(id, c, now))
                .collect();
            return degraded(trends, duplicates, capacity);
        }
    };

    let mut merged = Vec::with_capacity(batch.len());
    let (mut inserted, mut updated) = (0usize, 0usize);
    for (id, c) in batch {
        match known.remove(&id) {
            Some(mut existing) => {
                existing.refresh_from(c);
                updated += 1;
                merged.push(existing);
            }
            None => {
                inserted += 1;
                merged.push(Trend::with_id(id, c, now));
            }
        }
    }

    if let Err(e) = store.upsert_batch(merged.clone()).await {
        tracing::warn!(target: "reconcile", error = %e, "persisting trends failed; serving degraded batch");
        for t in &mut merged {
            t.discovered_at = now;
        }
        return degraded(merged, duplicates, capacity);
    }

    counter!("reconcile_inserted_total").increment(inserted as u64);
    counter!("reconcile_updated_total").increment(updated as u64);

    ReconcileOutcome {
        trends: newest_first(merged, capacity),
        inserted,
        updated,
        duplicates,
        degraded: false,
    }
}

fn degraded(trends: Vec<Trend>, duplicates: usize, capacity: usize) -> ReconcileOutcome {
    counter!("reconcile_degraded_total").increment(1);
    ReconcileOutcome {
        trends: newest_first(trends, capacity),
        inserted: 0,
        updated: 0,
        duplicates,
        degraded: true,
    }
}

/// Stable sort by `discovered_at` descending, then cap.
pub fn newest_first(mut trends: Vec<Trend>, capacity: usize) -> Vec<Trend> {
    trends.sort_by(|a, b| b.discovered_at.cmp(&a.discovered_at));
    trends.truncate(capacity);
    trends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{self, SqliteStore, StoreError};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 9, 30, 0).unwrap()
    }

    fn cand(title: &str, link: &str, source: &str) -> TrendCandidate {
        TrendCandidate::new(title, link, source)
    }

    /// Store whose reads or writes always fail.
    struct BrokenStore {
        fail_reads: bool,
    }

    #[async_trait]
    impl TrendStore for BrokenStore {
        async fn load_by_ids(&self, _ids: Vec<String>) -> store::Result<HashMap<String, Trend>> {
            if self.fail_reads {
                Err(StoreError::Task("disk gone".into()))
            } else {
                Ok(HashMap::new())
            }
        }
        async fn upsert_batch(&self, _trends: Vec<Trend>) -> store::Result<()> {
            Err(StoreError::Task("disk gone".into()))
        }
        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> store::Result<usize> {
            Ok(0)
        }
        async fn recent(&self, _limit: usize) -> store::Result<Vec<Trend>> {
            Ok(Vec::new())
        }
        async fn count(&self) -> store::Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn rediscovery_keeps_first_seen_time() {
        let store = SqliteStore::open_memory().expect("store");
        let hn = || cand("Show HN: Foo", "https://news.ycombinator.com/item?id=1", "From Hacker News");

        let first = reconcile(&store, vec![hn()], t0(), 2000).await;
        assert_eq!(first.inserted, 1);
        assert_eq!(first.trends[0].discovered_at, t0());

        let later = reconcile(&store, vec![hn()], t0() + Duration::minutes(30), 2000).await;
        assert_eq!(later.inserted, 0);
        assert_eq!(later.updated, 1);
        assert_eq!(later.trends[0].discovered_at, t0());
        assert_eq!(later.trends[0].id, first.trends[0].id);
    }

    #[tokio::test]
    async fn same_batch_twice_is_idempotent() {
        let store = SqliteStore::open_memory().expect("store");
        let batch = || {
            vec![
                cand("a", "https://a.test/1", "From A"),
                cand("b", "https://b.test/1", "From B"),
            ]
        };
        let one = reconcile(&store, batch(), t0(), 2000).await;
        let two = reconcile(&store, batch(), t0(), 2000).await;
        assert_eq!(one.trends, two.trends);
        assert_eq!(store.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn changed_display_fields_do_not_move_discovery_time() {
        let store = SqliteStore::open_memory().expect("store");
        reconcile(&store, vec![cand("Title", "https://x.test/p", "From X")], t0(), 2000).await;

        let edited = cand("title!!", "https://x.test/p/", "From X")
            .with_description("fresh description")
            .with_image(Some("https://img.test/1.png".into()));
        let out = reconcile(&store, vec![edited], t0() + Duration::hours(6), 2000).await;

        let t = &out.trends[0];
        assert_eq!(t.discovered_at, t0());
        assert_eq!(t.title, "title!!");
        assert_eq!(t.description.as_deref(), Some("fresh description"));
        assert_eq!(t.image, "https://img.test/1.png");
    }

    #[tokio::test]
    async fn batch_duplicates_collapse_to_first() {
        let store = SqliteStore::open_memory().expect("store");
        let batch = vec![
            cand("Same Story", "https://s.test/x", "From First"),
            cand("same story", "https://s.test/x?ref=2", "From Second"),
            cand("Other", "https://s.test/y", "From First"),
        ];
        let out = reconcile(&store, batch, t0(), 2000).await;
        assert_eq!(out.trends.len(), 2);
        assert_eq!(out.duplicates, 1);
        let same = out
            .trends
            .iter()
            .find(|t| t.title == "Same Story")
            .expect("first duplicate kept");
        assert_eq!(same.source, "From First");
    }

    #[tokio::test]
    async fn sorted_newest_first_and_capped() {
        let store = SqliteStore::open_memory().expect("store");
        reconcile(&store, vec![cand("old", "https://o.test", "From O")], t0(), 2000).await;

        let batch = vec![
            cand("old", "https://o.test", "From O"),
            cand("new 1", "https://n.test/1", "From N"),
            cand("new 2", "https://n.test/2", "From N"),
        ];
        let out = reconcile(&store, batch, t0() + Duration::hours(1), 2).await;
        assert_eq!(out.trends.len(), 2);
        assert!(out.trends.iter().all(|t| t.discovered_at == t0() + Duration::hours(1)));
        assert_eq!(out.trends[0].title, "new 1");
        assert_eq!(out.trends[1].title, "new 2");
    }

    #[tokio::test]
    async fn read_failure_degrades_instead_of_failing() {
        let store = BrokenStore { fail_reads: true };
        let out = reconcile(&store, vec![cand("a", "https://a.test", "From A")], t0(), 2000).await;
        assert!(out.degraded);
        assert_eq!(out.trends.len(), 1);
        assert_eq!(out.trends[0].discovered_at, t0());
    }

    #[tokio::test]
    async fn write_failure_degrades_instead_of_failing() {
        let store = BrokenStore { fail_reads: false };
        let out = reconcile(
            &store,
            vec![cand("a", "https://a.test", "From A"), cand("b", "https://b.test", "From B")],
            t0(),
            2000,
        )
        .await;
        assert!(out.degraded);
        assert_eq!(out.trends.len(), 2);
        assert_eq!((out.inserted, out.updated), (0, 0));
    }

    #[tokio::test]
    async fn empty_batch_is_fine() {
        let store = SqliteStore::open_memory().expect("store");
        let out = reconcile(&store, Vec::new(), t0(), 2000).await;
        assert!(out.trends.is_empty());
        assert!(!out.degraded);
    }
}
