//! Error types for trackgate-core

use thiserror::Error;

/// Main error type for the trackgate-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Reporting was requested before `configure()`
    #[error("analytics not configured: call configure() first")]
    NotConfigured,

    /// Failure raised by the underlying tracker
    #[error("tracker error: {0}")]
    Tracker(String),
}

/// Result type alias for trackgate-core
pub type Result<T> = std::result::Result<T, Error>;
