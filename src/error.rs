//! Error types for the news-dashboard library.
//!
//! Library code returns [`DashboardError`]; the binary and the configuration
//! loader work in `anyhow` and convert at the edge.

use thiserror::Error;

/// Errors that can occur in the news dashboard.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The entity tagger failed on a piece of text
    #[error("Tagger error: {0}")]
    Tagger(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rejected request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A blocking or spawned task did not complete
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A refresh tick exceeded its time budget
    #[error("Refresh tick timed out after {0}s")]
    Timeout(u64),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<anyhow::Error> for DashboardError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
