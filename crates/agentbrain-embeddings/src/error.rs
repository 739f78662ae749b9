//! Error types for embedding provider calls.

use thiserror::Error;

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(String),

    #[error("embedding provider returned an error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for EmbeddingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
