//! Graph triple and query-result shapes.

use serde::{Deserialize, Serialize};

/// One subject-predicate-object fact harvested from a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTriple {
    pub subject: String,
    pub subject_type: Option<String>,
    pub predicate: String,
    pub object: String,
    pub object_type: Option<String>,
    pub source_chunk_id: Option<String>,
}

impl GraphTriple {
    #[must_use]
    pub fn relationship_path(&self) -> String {
        format!("{} --{}--> {}", self.subject, self.predicate, self.object)
    }
}

/// Common relationship predicates emitted by the code metadata extractor.
pub const PREDICATE_IMPORTS: &str = "imports";
pub const PREDICATE_CONTAINS: &str = "contains";
pub const PREDICATE_DEFINED_IN: &str = "defined_in";

/// One match surfaced by a graph query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQueryMatch {
    pub entity: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub source_chunk_id: Option<String>,
    pub relationship_path: String,
    pub graph_score: f32,
}

/// Sidecar persisted alongside the triple store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub entity_count: usize,
    pub relationship_count: usize,
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}
