//! Trend service binary entrypoint.
//! Boots storage, collectors and background loops, then serves the Axum router.

use std::net::SocketAddr;

use axum::Router;
use shuttle_runtime::{CustomError, Error};
use trendwire::config::AppConfig;

/// Binds the router with peer addresses attached, which the stock Axum
/// service does not do.
struct TrendService(Router);

#[shuttle_runtime::async_trait]
impl shuttle_runtime::Service for TrendService {
    async fn bind(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(CustomError::new)?;
        tracing::info!(%addr, "listening");
        trendwire::serve(listener, self.0)
            .await
            .map_err(CustomError::new)?;
        Ok(())
    }
}

#[shuttle_runtime::main]
async fn axum() -> Result<TrendService, Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    trendwire::init_tracing();

    let cfg = AppConfig::from_env();
    let state = trendwire::bootstrap(&cfg).await?;
    // Router first: it installs the metrics recorder the loops report into.
    let app = trendwire::router(state.clone());
    trendwire::spawn_background(&state, &cfg);

    Ok(TrendService(app))
}
