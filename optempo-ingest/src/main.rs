//! optempo-ingest - Telemetry Ingestion & Tempo Scoring service
//!
//! Ingests live aircraft telemetry from the upstream broadcast
//! surveillance feed, persists the military-interest subset, and derives
//! an hourly operational tempo score. Exposes a read-only status surface
//! over HTTP.

use anyhow::Result;
use optempo_common::config::IngestConfig;
use optempo_ingest::services::{IngestService, Scheduler, TempoScorer};
use optempo_ingest::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting optempo-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = IngestConfig::load();
    info!(
        feed_url = %config.feed_url,
        interval_secs = config.ingest_interval_secs,
        "Configuration resolved"
    );

    let db_pool = optempo_common::db::init_database(&config.database_path).await?;
    info!("Database: {}", config.database_path.display());

    let ingest = Arc::new(IngestService::from_config(db_pool.clone(), &config)?);
    let scorer = Arc::new(TempoScorer::new(db_pool.clone()));

    let cancel = CancellationToken::new();
    Scheduler::new(
        ingest.clone(),
        scorer,
        config.ingest_interval_secs,
        cancel.clone(),
    )
    .spawn();

    let state = AppState::new(db_pool, ingest);
    let app = optempo_ingest::build_router(state);

    let addr = format!("127.0.0.1:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    Ok(())
}

/// Resolve on ctrl-c and stop the trigger loops before the server exits
async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
    cancel.cancel();
}
