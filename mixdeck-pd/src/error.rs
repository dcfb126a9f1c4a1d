//! Error types for mixdeck-pd
//!
//! Module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the Play Director service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Player handle reported or caused a failure
    #[error("Player error: {0}")]
    Player(String),

    /// Search provider errors
    #[error("Search error: {0}")]
    Search(String),

    /// Director command channel closed or full
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using mixdeck-pd Error
pub type Result<T> = std::result::Result<T, Error>;
