//! Error types for storage backend operations

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in a storage backend.
///
/// Every backend-specific failure (Qdrant, Postgres, the in-memory BM25
/// index) is normalized into one of these variants before it crosses the
/// trait boundary, so callers never need to match on backend internals.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend has not been initialized yet.
    #[error("storage backend {backend} is not initialized")]
    NotInitialized { backend: String },

    /// A configured embedding fingerprint does not match what is stored.
    #[error("embedding fingerprint mismatch on {backend}: {message}")]
    DimensionMismatch { backend: String, message: String },

    /// Requested id not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input lists had mismatched lengths, or some other caller contract was broken.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backend-specific operation failure (connection, query, collection management).
    #[error("{backend} storage error: {message}")]
    Backend { backend: String, message: String },

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error persisting or reading backend state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other issues.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend {
            backend: "postgres".to_string(),
            message: err.to_string(),
        }
    }
}
