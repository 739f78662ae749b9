//! Query fusion pipeline: five retrieval modes (vector, BM25, graph,
//! hybrid, multi) over the storage backend and, optionally, the
//! knowledge graph.

pub mod error;
pub mod fusion;
pub mod models;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{QueryError, QueryResult};
pub use models::{QueryMatch, QueryOutcome, QueryRequest, SearchMode};
pub use service::{FusionQueryService, QueryService};
