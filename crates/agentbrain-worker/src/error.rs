//! Error types for the indexing pipeline and job worker.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    /// The job was cancelled by user request mid-pipeline.
    #[error("Job was cancelled by user request")]
    Cancelled,

    #[error("folder path error: {0}")]
    InvalidFolder(String),

    #[error(transparent)]
    Storage(#[from] agentbrain_storage::StorageError),

    #[error(transparent)]
    Embedding(#[from] agentbrain_embeddings::EmbeddingError),

    #[error(transparent)]
    Chunking(#[from] agentbrain_chunking::ParsingError),

    #[error(transparent)]
    Queue(#[from] agentbrain_queue::QueueError),

    #[error(transparent)]
    Graph(#[from] agentbrain_graph::GraphError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
