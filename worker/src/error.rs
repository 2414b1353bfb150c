//! Error types for the search worker.

use semsearch_core::SearchError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the worker, transport and report source.
///
/// The `Display` text is what callers see in outbound `error` events.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Core(#[from] SearchError),

    #[error("Could not initialize vector database")]
    IndexUnavailable,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Worker stopped")]
    Closed,

    /// An `error` event observed by a caller of the worker
    #[error("{0}")]
    RequestFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;
