//! # Trend cache
//!
//! Holds the current [`Snapshot`] behind an `ArcSwapOption`. Readers get an
//! owned `Arc` and keep a consistent view while a refresh swaps in new data;
//! a snapshot is never mutated after it is installed.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use serde::Serialize;

use crate::trend::Trend;

/// Where a snapshot's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// A completed collect + reconcile cycle.
    Refresh,
    /// Rows read back from storage at startup. Always considered stale.
    Seed,
}

/// Time-ordered items plus the moment they were captured.
#[derive(Debug)]
pub struct Snapshot {
    pub items: Vec<Trend>,
    pub captured_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new(items: Vec<Trend>, captured_at: DateTime<Utc>, origin: SnapshotOrigin) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self {
            items,
            captured_at,
            origin,
            index,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Trend> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sorted, unique source labels.
    pub fn sources(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|t| t.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_stale(&self, now: DateTime<Utc>, refresh_interval: Duration) -> bool {
        self.origin == SnapshotOrigin::Seed || now - self.captured_at > refresh_interval
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Stale,
    Refreshing,
    Fresh,
}

pub(crate) struct RefreshingGuard<'a>(&'a AtomicBool);

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct TrendCache {
    current: ArcSwapOption<Snapshot>,
    refreshing: AtomicBool,
    refresh_interval: Duration,
}

impl TrendCache {
    pub fn new(refresh_interval: std::time::Duration) -> Self {
        Self {
            current: ArcSwapOption::const_empty(),
            refreshing: AtomicBool::new(false),
            refresh_interval: Duration::from_std(refresh_interval)
                .unwrap_or_else(|_| Duration::minutes(30)),
        }
    }

    /// The installed snapshot, if any.
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Atomically replace the snapshot.
    pub fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snap = Arc::new(snapshot);
        gauge!("cache_items").set(snap.len() as f64);
        gauge!("cache_last_refresh_ts").set(snap.captured_at.timestamp() as f64);
        self.current.store(Some(Arc::clone(&snap)));
        snap
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Mark a cycle in flight until the returned guard drops, including on
    /// unwind.
    pub(crate) fn begin_refresh(&self) -> RefreshingGuard<'_> {
        self.refreshing.store(true, Ordering::SeqCst);
        RefreshingGuard(&self.refreshing)
    }

    pub fn status(&self, now: DateTime<Utc>) -> CacheStatus {
        if self.refreshing.load(Ordering::SeqCst) {
            return CacheStatus::Refreshing;
        }
        match self.load() {
            Some(s) if !s.is_stale(now, self.refresh_interval) => CacheStatus::Fresh,
            _ => CacheStatus::Stale,
        }
    }
}
