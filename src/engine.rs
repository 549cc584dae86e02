//! # Refresh engine
//!
//! Owns the provider registry, the store and the cache, and drives the
//! collect → reconcile → install cycle.
//!
//! - Cycles are serialized by an async mutex. A manual refresh waits for an
//!   in-flight cycle and then runs its own.
//! - A read that finds a stale snapshot starts at most one background cycle
//!   and returns what is installed now.
//! - A read with nothing installed waits for a cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::cache::{CacheStatus, Snapshot, SnapshotOrigin, TrendCache};
use crate::ingest::{self, types::SourceProvider, ProviderReport};
use crate::reconcile;
use crate::store::{self, TrendStore};

/// Tunables for [`RefreshEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub capacity: usize,
    pub provider_timeout: Duration,
    pub refresh_interval: Duration,
    pub retention: chrono::Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            capacity: 2000,
            provider_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30 * 60),
            retention: chrono::Duration::days(7),
        }
    }
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub providers: Vec<ProviderReport>,
    pub candidates: usize,
    pub items: usize,
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub degraded: bool,
    /// False when the round produced nothing and the previous snapshot was kept.
    pub installed: bool,
}

pub struct RefreshEngine {
    providers: Vec<Arc<dyn SourceProvider>>,
    store: Arc<dyn TrendStore>,
    cache: TrendCache,
    settings: EngineSettings,
    refresh_lock: Arc<Mutex<()>>,
    last_report: SyncMutex<Option<RefreshReport>>,
}

impl RefreshEngine {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        store: Arc<dyn TrendStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            cache: TrendCache::new(settings.refresh_interval),
            providers,
            store,
            settings,
            refresh_lock: Arc::new(Mutex::new(())),
            last_report: SyncMutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn cache(&self) -> &TrendCache {
        &self.cache
    }

    pub fn status(&self) -> CacheStatus {
        self.cache.status(Utc::now())
    }

    pub fn last_report(&self) -> Option<RefreshReport> {
        self.last_report.lock().clone()
    }

    /// Install the most recent persisted rows so the first readers after a
    /// restart do not wait on the network. The seed is stale from the start.
    pub async fn seed_from_store(&self) -> store::Result<usize> {
        let rows = self.store.recent(self.settings.capacity).await?;
        let n = rows.len();
        if self.cache.load().is_none() && n > 0 {
            self.cache
                .install(Snapshot::new(rows, Utc::now(), SnapshotOrigin::Seed));
            tracing::info!(target: "engine", items = n, "cache seeded from store");
        }
        Ok(n)
    }

    /// Run a cycle now, after any in-flight one finishes.
    pub async fn refresh(&self) -> RefreshReport {
        let _guard = self.refresh_lock.lock().await;
        self.run_cycle().await
    }

    /// Start a cycle on a background task unless one is already running.
    /// Returns whether a cycle was started.
    pub fn refresh_in_background(self: &Arc<Self>) -> bool {
        let Ok(guard) = Arc::clone(&self.refresh_lock).try_lock_owned() else {
            return false;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            this.run_cycle().await;
        });
        true
    }

    /// Current snapshot for a reader at `Utc::now()`.
    pub async fn snapshot(self: &Arc<Self>) -> Arc<Snapshot> {
        self.snapshot_at(Utc::now()).await
    }

    /// Current snapshot for a reader at `now`. Stale data is served while a
    /// background cycle replaces it.
    pub async fn snapshot_at(self: &Arc<Self>, now: DateTime<Utc>) -> Arc<Snapshot> {
        if let Some(snap) = self.cache.load() {
            if snap.is_stale(now, self.cache.refresh_interval()) && self.refresh_in_background() {
                tracing::debug!(target: "engine", "stale read; background refresh started");
            }
            return snap;
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(snap) = self.cache.load() {
            return snap;
        }
        self.run_cycle().await;
        self.cache
            .load()
            .unwrap_or_else(|| Arc::new(Snapshot::new(Vec::new(), now, SnapshotOrigin::Refresh)))
    }

    /// Delete persisted trends older than the retention window.
    pub async fn sweep_retention(&self, now: DateTime<Utc>) -> store::Result<usize> {
        let cutoff = now - self.settings.retention;
        let removed = self.store.delete_older_than(cutoff).await?;
        counter!("retention_deleted_total").increment(removed as u64);
        tracing::info!(target: "engine", removed, %cutoff, "retention sweep finished");
        Ok(removed)
    }

    /// One collect → reconcile → install pass. Caller holds `refresh_lock`.
    async fn run_cycle(&self) -> RefreshReport {
        let refreshing = self.cache.begin_refresh();
        let started_at = Utc::now();
        let t0 = Instant::now();

        let collected = ingest::collect_all(&self.providers, self.settings.provider_timeout).await;
        let candidates = collected.candidates.len();

        let outcome = reconcile::reconcile(
            self.store.as_ref(),
            collected.candidates,
            Utc::now(),
            self.settings.capacity,
        )
        .await;

        // An empty round over an existing snapshot keeps the old items.
        let installed = !(outcome.trends.is_empty() && self.cache.load().is_some());
        let items = outcome.trends.len();
        if installed {
            self.cache
                .install(Snapshot::new(outcome.trends, Utc::now(), SnapshotOrigin::Refresh));
        } else {
            tracing::warn!(target: "engine", "refresh produced no items; keeping previous snapshot");
        }
        drop(refreshing);

        let duration_ms = t0.elapsed().as_millis() as u64;
        counter!("refresh_runs_total").increment(1);
        histogram!("refresh_duration_ms").record(duration_ms as f64);

        let report = RefreshReport {
            started_at,
            duration_ms,
            providers: collected.reports,
            candidates,
            items,
            inserted: outcome.inserted,
            updated: outcome.updated,
            duplicates: outcome.duplicates,
            degraded: outcome.degraded,
            installed,
        };
        tracing::info!(
            target: "engine",
            items = report.items,
            inserted = report.inserted,
            updated = report.updated,
            degraded = report.degraded,
            duration_ms,
            "refresh finished"
        );
        *self.last_report.lock() = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::TrendCandidate;
    use crate::store::SqliteStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns its list and counts calls.
    struct Counting {
        calls: Arc<AtomicUsize>,
        items: Vec<TrendCandidate>,
    }

    #[async_trait]
    impl SourceProvider for Counting {
        async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.clone())
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct Down;

    #[async_trait]
    impl SourceProvider for Down {
        async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
            Err(anyhow!("connection refused"))
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    fn engine_with(
        providers: Vec<Arc<dyn SourceProvider>>,
        store: SqliteStore,
    ) -> Arc<RefreshEngine> {
        Arc::new(RefreshEngine::new(
            providers,
            Arc::new(store),
            EngineSettings::default(),
        ))
    }

    fn counting(calls: &Arc<AtomicUsize>) -> Arc<dyn SourceProvider> {
        Arc::new(Counting {
            calls: Arc::clone(calls),
            items: vec![TrendCandidate::new("Show HN: Foo", "https://news.ycombinator.com/item?id=1", "From Hacker News")],
        })
    }

    #[tokio::test]
    async fn first_read_waits_for_a_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with(vec![counting(&calls)], SqliteStore::open_memory().unwrap());

        let snap = engine.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.status(), CacheStatus::Fresh);

        // Fresh reads do not trigger more cycles.
        engine.snapshot().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_read_serves_old_snapshot_and_refreshes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with(vec![counting(&calls)], SqliteStore::open_memory().unwrap());
        let first = engine.refresh().await;
        assert!(first.installed);

        let later = Utc::now() + chrono::Duration::hours(1);
        let held = engine.cache().load().unwrap();
        let served = engine.snapshot_at(later).await;
        assert!(Arc::ptr_eq(&held, &served));

        // Let the background cycle finish; a manual refresh queues behind it.
        engine.refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn at_most_one_background_refresh_in_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with(vec![counting(&calls)], SqliteStore::open_memory().unwrap());
        let guard = engine.refresh_lock.lock().await;
        assert!(!engine.refresh_in_background());
        drop(guard);
        assert!(engine.refresh_in_background());
        assert!(!engine.refresh_in_background());
    }

    #[tokio::test]
    async fn all_sources_down_keeps_previous_items() {
        let store = SqliteStore::open_memory().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let up = engine_with(vec![counting(&calls)], store.clone());
        up.refresh().await;

        let down: Arc<dyn SourceProvider> = Arc::new(Down);
        let down = engine_with(vec![down], store);
        down.seed_from_store().await.expect("seed");
        let report = down.refresh().await;
        assert!(!report.installed);
        assert_eq!(down.cache().load().unwrap().len(), 1);
        assert_eq!(down.status(), CacheStatus::Stale);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = SqliteStore::open_memory().unwrap();
        let engine = engine_with(vec![counting(&calls)], store.clone());
        engine.refresh().await;

        assert_eq!(engine.sweep_retention(Utc::now()).await.unwrap(), 0);
        let removed = engine
            .sweep_retention(Utc::now() + chrono::Duration::days(8))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    /// Store whose reads panic, standing in for a bug mid-cycle.
    struct PanickingStore;

    #[async_trait]
    impl TrendStore for PanickingStore {
        async fn load_by_ids(
            &self,
            _ids: Vec<String>,
        ) -> store::Result<std::collections::HashMap<String, crate::trend::Trend>> {
            panic!("corrupt row")
        }
        async fn upsert_batch(&self, _trends: Vec<crate::trend::Trend>) -> store::Result<()> {
            Ok(())
        }
        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> store::Result<usize> {
            Ok(0)
        }
        async fn recent(&self, _limit: usize) -> store::Result<Vec<crate::trend::Trend>> {
            Ok(Vec::new())
        }
        async fn count(&self) -> store::Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn panicking_cycle_does_not_leave_status_refreshing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(RefreshEngine::new(
            vec![counting(&calls)],
            Arc::new(PanickingStore),
            EngineSettings::default(),
        ));

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.refresh().await }
        });
        assert!(task.await.expect_err("cycle panics").is_panic());

        assert_eq!(engine.status(), CacheStatus::Stale);
        // The lock is released too, so the next cycle can start.
        assert!(engine.refresh_in_background());
    }
}
