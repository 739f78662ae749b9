//! Storage backends for indexed code chunks.
//!
//! Two backends implement the same [`StorageBackend`] trait: a columnar
//! backend (Qdrant plus an in-memory BM25 lexical index) and a relational
//! backend (Postgres with pgvector and tsvector). Callers depend only on
//! the trait; which backend is active is decided once at lifecycle wiring
//! time from [`agentbrain_config::StorageVariant`].

pub mod bm25;
pub mod error;
pub mod storage;

pub use error::{StorageError, StorageResult};
pub use storage::{
    ColumnarBackend, EmbeddingMetadata, MockStorage, RelationalBackend, SearchFilter,
    SearchResult, StorageBackend, UpsertDocument, validate_embedding_compatibility,
};

use agentbrain_config::{AppConfig, StorageVariant};
use std::path::Path;
use std::sync::Arc;

/// Construct the configured storage backend, without calling `initialize`.
///
/// # Errors
/// Returns [`StorageError`] if the backend cannot be constructed (e.g. an
/// invalid Qdrant client builder, or `storage.postgres_url` missing when
/// [`StorageVariant::RelationalVector`] is selected — `AppConfig::validate`
/// should already have caught the latter before this is called).
pub async fn build_backend(
    config: &AppConfig,
    state_dir: &Path,
) -> StorageResult<Arc<dyn StorageBackend>> {
    match config.storage.variant {
        StorageVariant::ColumnarEmbedded => {
            let dimensions = config.embedding.dimensions.unwrap_or(768);
            let metadata_path = state_dir.join("embedding_metadata.json");
            let backend = ColumnarBackend::new(
                &config.storage.qdrant_url,
                &config.storage.collection_name,
                dimensions,
                config.storage.bm25_k1,
                config.storage.bm25_b,
                metadata_path,
            )?;
            Ok(Arc::new(backend))
        }
        StorageVariant::RelationalVector => {
            let dimensions = config.embedding.dimensions.unwrap_or(768);
            let url = config.storage.postgres_url.as_deref().ok_or_else(|| {
                StorageError::Backend {
                    backend: "postgres".to_string(),
                    message: "storage.postgres_url is not configured".to_string(),
                }
            })?;
            let backend = RelationalBackend::connect(url, dimensions).await?;
            Ok(Arc::new(backend))
        }
    }
}
