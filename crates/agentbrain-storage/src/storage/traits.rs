//! Unified storage backend abstraction.
//!
//! A single async trait covers both the columnar/embedded backend (Qdrant
//! plus an in-memory BM25 index) and the relational backend (Postgres with
//! pgvector + tsvector), so the query and indexing pipelines never need to
//! know which one is active.

use crate::StorageResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend-agnostic search result. Scores are normalized to 0-1, higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f32,
}

/// Optional metadata filter applied to a search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub source_types: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub file_paths_glob: Option<String>,
}

/// Document to upsert: one chunk's embedding, text, and metadata.
#[derive(Debug, Clone)]
pub struct UpsertDocument {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Embedding provider fingerprint, stored alongside the collection so later
/// queries can detect an incompatible model swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

/// Storage backend operations, implemented by both the columnar/embedded
/// and relational backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Whether the backend has completed `initialize`.
    async fn is_initialized(&self) -> StorageResult<bool>;

    /// Create collections/tables/indexes and validate schema compatibility.
    async fn initialize(&self) -> StorageResult<()>;

    /// Upsert documents. Existing ids are overwritten. Returns the count upserted.
    async fn upsert(&self, documents: &[UpsertDocument]) -> StorageResult<usize>;

    /// Vector similarity search, results sorted by score descending.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>>;

    /// Keyword (BM25/tsvector) search, results sorted by score descending.
    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>>;

    /// Count of stored documents, optionally filtered.
    async fn get_count(&self, filter: &SearchFilter) -> StorageResult<usize>;

    /// Fetch a single document by id.
    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>>;

    /// Delete all documents and stored embedding metadata, reinitializing to a clean state.
    async fn reset(&self) -> StorageResult<()>;

    /// Stored embedding fingerprint, if any has been set.
    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>>;

    /// Persist the embedding fingerprint for this collection.
    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()>;

    /// Rebuild the lexical (BM25) index from the full stored document set.
    /// A no-op for backends that maintain their keyword index incrementally
    /// on upsert (e.g. the relational backend's `tsvector` column).
    async fn rebuild_lexical_index(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Compare the live embedding configuration against what a backend has stored.
///
/// # Errors
/// Returns [`crate::StorageError::DimensionMismatch`] if the stored fingerprint
/// is for a different provider, model, or dimensionality.
pub fn validate_embedding_compatibility(
    backend_name: &str,
    live: &EmbeddingMetadata,
    stored: Option<&EmbeddingMetadata>,
) -> StorageResult<()> {
    let Some(stored) = stored else {
        return Ok(());
    };
    if stored != live {
        return Err(crate::StorageError::DimensionMismatch {
            backend: backend_name.to_string(),
            message: format!(
                "configured ({}/{}, {}d) vs stored ({}/{}, {}d)",
                live.provider,
                live.model,
                live.dimensions,
                stored.provider,
                stored.model,
                stored.dimensions
            ),
        });
    }
    Ok(())
}
