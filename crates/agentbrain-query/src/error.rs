//! Error types for the query fusion pipeline.

use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Graph mode was requested but no graph store is configured.
    #[error("graph mode requested but the graph index is disabled")]
    GraphDisabled,

    #[error("query text must be between 1 and {max} characters")]
    InvalidQuery { max: usize },

    #[error(transparent)]
    Storage(#[from] agentbrain_storage::StorageError),

    #[error(transparent)]
    Embedding(#[from] agentbrain_embeddings::EmbeddingError),

    #[error(transparent)]
    Graph(#[from] agentbrain_graph::GraphError),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for QueryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
