//! Error types for the job queue store

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("queue is at capacity ({0} jobs in flight)")]
    Capacity(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt queue record: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}
