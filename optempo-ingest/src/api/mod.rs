//! HTTP API handlers for optempo-ingest
//!
//! Thin read-only surface; the ingestion pipeline never depends on it.

pub mod health;
pub mod status;

pub use health::health_routes;
pub use status::status_routes;
