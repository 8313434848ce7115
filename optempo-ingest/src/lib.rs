//! optempo-ingest library interface
//!
//! Exposes the ingestion services, database accessors, and the status
//! HTTP surface for integration testing.

pub mod api;
pub mod db;
pub mod services;

use axum::Router;
use chrono::{DateTime, Utc};
use services::ingest::IngestService;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ingestion cycle controller (status read model)
    pub ingest: Arc<IngestService>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, ingest: Arc<IngestService>) -> Self {
        Self {
            db,
            ingest,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::status_routes())
        .with_state(state)
}
