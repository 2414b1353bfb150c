//! Error types for semsearch-core

use thiserror::Error;

/// Errors that can occur while loading models, encoding rows or searching
#[derive(Debug, Error)]
pub enum SearchError {
    /// Model acquisition or initialization error
    #[error("Model error: {0}")]
    Model(String),

    /// Model artifact download error
    #[error("Download error: {0}")]
    Download(String),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector length does not match the index/model dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Two records in one build share a record id
    #[error("Duplicate record id: {0}")]
    DuplicateRecord(String),

    /// Search issued before any index was built
    #[error("Index not initialized")]
    IndexNotInitialized,

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, SearchError>;
