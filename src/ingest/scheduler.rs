// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::RefreshEngine;

/// Refresh on a fixed cadence regardless of traffic. The first tick fires
/// immediately, which is the startup refresh.
pub fn spawn_refresh_loop(engine: Arc<RefreshEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = engine.refresh().await;
            tracing::debug!(target: "ingest", items = report.items, "scheduled refresh tick");
        }
    })
}

/// Delete expired trends on an independent cadence.
pub fn spawn_retention_sweep(engine: Arc<RefreshEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = engine.sweep_retention(chrono::Utc::now()).await {
                tracing::warn!(target: "ingest", error = %e, "retention sweep failed");
            }
        }
    })
}
