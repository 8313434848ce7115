//! Database operations for the ingestion service
//!
//! Accessors that run inside a per-record transaction take a
//! `&mut SqliteConnection` so the caller controls the transaction
//! boundary; read-side queries take the pool.

pub mod assets;
pub mod events;
pub mod scores;
