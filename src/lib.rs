// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod identity;
pub mod ingest;
pub mod metrics;
pub mod reconcile;
pub mod store;
pub mod trend;
pub mod votes;

pub use crate::api::{router, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::engine::RefreshEngine;
use crate::enrich::summarizer::build_summarizer;
use crate::ingest::{config::load_sources_default, providers, scheduler};
use crate::store::SqliteStore;

/// Structured logs to stdout. `LOG_FORMAT=json` switches to JSON lines.
/// No-op if a global subscriber is already installed (e.g. by the runtime).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendwire=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Open storage, build the provider registry and the summarizer, and seed the
/// cache from the last persisted trends. Storage failure here is fatal.
pub async fn bootstrap(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(
        SqliteStore::open(&cfg.db_path)
            .with_context(|| format!("opening trend store at {}", cfg.db_path.display()))?,
    );

    let sources = load_sources_default().context("loading source list")?;
    let client = providers::http_client(cfg.provider_timeout)?;
    let registry = providers::build_registry(&sources, &cfg.provider_settings(), &client);
    tracing::info!(
        providers = ?registry.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "provider registry built"
    );

    let engine = Arc::new(RefreshEngine::new(
        registry,
        store.clone(),
        cfg.engine_settings(),
    ));
    if let Err(e) = engine.seed_from_store().await {
        tracing::warn!(error = %e, "seeding cache from store failed");
    }

    let summarizer = build_summarizer(&cfg.summarizer_config())?;
    tracing::info!(provider = summarizer.provider_name(), "summarizer ready");

    Ok(AppState {
        engine,
        votes: store,
        summarizer,
        static_dir: cfg.static_dir.clone(),
        trust_proxy: cfg.trust_proxy,
    })
}

/// Start the refresh and retention loops. The refresh loop's first tick is
/// the startup refresh.
pub fn spawn_background(state: &AppState, cfg: &AppConfig) -> (JoinHandle<()>, JoinHandle<()>) {
    let refresh = scheduler::spawn_refresh_loop(Arc::clone(&state.engine), cfg.refresh_interval);
    let sweep = scheduler::spawn_retention_sweep(Arc::clone(&state.engine), cfg.sweep_interval);
    tracing::info!(
        refresh_secs = cfg.refresh_interval.as_secs(),
        sweep_secs = cfg.sweep_interval.as_secs(),
        "background loops started"
    );
    (refresh, sweep)
}

/// Serve `app` on `listener`, recording each connection's peer address for
/// the voter key.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
