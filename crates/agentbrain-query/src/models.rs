//! Request/result shapes for the query fusion pipeline.

use std::collections::HashMap;

use agentbrain_storage::SearchResult;

/// Which retrieval strategy a query uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Vector,
    Bm25,
    Graph,
    Hybrid,
    Multi,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub mode: SearchMode,
    pub top_k: usize,
    pub similarity_threshold: f32,
    /// Weight given to the vector score in hybrid mode; `1 - alpha` goes to BM25.
    pub alpha: f32,
    pub source_types: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    /// Glob patterns; a result passes if its file path matches any one of them.
    pub file_paths: Option<Vec<String>>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            query: query.into(),
            mode,
            top_k: 5,
            similarity_threshold: 0.7,
            alpha: 0.5,
            source_types: None,
            languages: None,
            file_paths: None,
        }
    }
}

/// One chunk surfaced by a query, with whichever per-mode scores produced it.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub chunk_id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f32,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub graph_score: Option<f32>,
    /// Subject and object of the graph triple that surfaced this chunk.
    pub related_entities: Option<(String, String)>,
    pub relationship_path: Option<String>,
}

impl QueryMatch {
    #[must_use]
    pub fn from_vector(result: SearchResult) -> Self {
        Self {
            chunk_id: result.chunk_id,
            text: result.text,
            metadata: result.metadata,
            score: result.score,
            vector_score: Some(result.score),
            bm25_score: None,
            graph_score: None,
            related_entities: None,
            relationship_path: None,
        }
    }

    #[must_use]
    pub fn from_bm25(result: SearchResult) -> Self {
        Self {
            chunk_id: result.chunk_id,
            text: result.text,
            metadata: result.metadata,
            score: result.score,
            vector_score: None,
            bm25_score: Some(result.score),
            graph_score: None,
            related_entities: None,
            relationship_path: None,
        }
    }

    #[must_use]
    pub fn matches_file_paths(&self, patterns: &[String]) -> bool {
        let Some(file_path) = self.metadata.get("file_path").and_then(|v| v.as_str()) else {
            return false;
        };
        patterns
            .iter()
            .any(|pattern| glob::Pattern::new(pattern).is_ok_and(|compiled| compiled.matches(file_path)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub matches: Vec<QueryMatch>,
    pub query_time_ms: u64,
}
