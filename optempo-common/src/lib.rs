//! # OpTempo Common Library
//!
//! Shared code for the OpTempo services including:
//! - Error taxonomy
//! - Configuration loading (ENV → TOML → defaults)
//! - Database initialization and schema
//! - Shared domain models (auth mode, region bounds, cycle summary)

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
