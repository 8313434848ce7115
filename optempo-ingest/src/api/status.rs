//! Ingestion status endpoint
//!
//! Read-only snapshot of the cycle controller: running flag, last
//! successful run, configured region bounds, auth mode in use. A stale
//! `last_run` is how reduced data completeness becomes observable.

use axum::{extract::State, routing::get, Json, Router};
use optempo_common::models::IngestStatus;

use crate::AppState;

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<IngestStatus> {
    Json(state.ingest.status().await)
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
