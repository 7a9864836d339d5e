use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listings_engine::api::{router, ApiState};
use listings_engine::clock::{SharedClock, SystemClock};
use listings_engine::config::Config;
use listings_engine::db::Store;
use listings_engine::error::Result;
use listings_engine::query::QueryEngine;

/// How often expired cache entries are swept.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = Store::open(&cfg.db_path, cfg.query_timeout).await?;
    store.migrate().await?;

    // --- Engine ---
    let cfg = Arc::new(cfg);
    let clock: SharedClock = Arc::new(SystemClock);
    let engine = Arc::new(QueryEngine::new(store, Arc::clone(&cfg), clock)?);
    info!(
        timeout_ms = cfg.query_timeout.as_millis() as u64,
        cache_ttl_secs = cfg.cache_ttl.as_secs(),
        monitor_capacity = cfg.monitor_capacity,
        "query engine ready",
    );

    // Cache sweeper (background)
    let sweeper = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.cache().evict_expired();
        }
    });

    // --- HTTP API server ---
    let app = router(ApiState { engine });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
