//! Common error types for OpTempo

use thiserror::Error;

/// Common result type for OpTempo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across OpTempo services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream feed failure scoped to one ingestion cycle
    #[error("Feed error: {0}")]
    Feed(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}
