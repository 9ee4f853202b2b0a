//! Error types for aspc-ctl
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The signal core never produces these: only configuration,
//! the command store and the service surface can fail.

use thiserror::Error;

/// Main error type for aspc-ctl
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors bubbled up from aspc-common
    #[error(transparent)]
    Common(#[from] aspc_common::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Junction id is not configured
    #[error("Junction not found: {0}")]
    JunctionNotFound(String),

    /// Junction is configured but no controller is running for it
    #[error("Junction not observed: {0}")]
    NotObserved(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using aspc-ctl Error
pub type Result<T> = std::result::Result<T, Error>;
