//! In-memory storage backend used by tests and the `test-util` feature.

use crate::StorageResult;
use crate::bm25::Bm25Index;
use crate::storage::traits::{
    EmbeddingMetadata, SearchFilter, SearchResult, StorageBackend, UpsertDocument,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

struct StoredDoc {
    text: String,
    embedding: Vec<f32>,
    metadata: HashMap<String, serde_json::Value>,
}

/// Deterministic in-memory stand-in for either real backend, implementing
/// the same trait so query/worker code paths don't need a running database.
#[derive(Default)]
pub struct MockStorage {
    docs: RwLock<HashMap<String, StoredDoc>>,
    metadata: RwLock<Option<EmbeddingMetadata>>,
    initialized: RwLock<bool>,
}

impl MockStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lexical_index(&self) -> Bm25Index {
        let docs = self.docs.read().expect("mock docs lock poisoned");
        let mut index = Bm25Index::new(1.5, 0.75);
        index.rebuild(docs.iter().map(|(id, doc)| (id.as_str(), doc.text.as_str())));
        index
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn passes_filter(metadata: &HashMap<String, serde_json::Value>, filter: &SearchFilter) -> bool {
    if let Some(source_types) = &filter.source_types {
        let matches = metadata
            .get("source_type")
            .and_then(|v| v.as_str())
            .is_some_and(|st| source_types.iter().any(|t| t == st));
        if !matches {
            return false;
        }
    }
    if let Some(languages) = &filter.languages {
        let matches = metadata
            .get("language")
            .and_then(|v| v.as_str())
            .is_some_and(|lang| languages.iter().any(|l| l == lang));
        if !matches {
            return false;
        }
    }
    true
}

#[async_trait]
impl StorageBackend for MockStorage {
    async fn is_initialized(&self) -> StorageResult<bool> {
        Ok(*self.initialized.read().expect("mock init lock poisoned"))
    }

    async fn initialize(&self) -> StorageResult<()> {
        *self.initialized.write().expect("mock init lock poisoned") = true;
        Ok(())
    }

    async fn upsert(&self, documents: &[UpsertDocument]) -> StorageResult<usize> {
        let mut docs = self.docs.write().expect("mock docs lock poisoned");
        for doc in documents {
            docs.insert(
                doc.id.clone(),
                StoredDoc {
                    text: doc.text.clone(),
                    embedding: doc.embedding.clone(),
                    metadata: doc.metadata.clone(),
                },
            );
        }
        Ok(documents.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        let docs = self.docs.read().expect("mock docs lock poisoned");
        let mut results: Vec<SearchResult> = docs
            .iter()
            .filter(|(_, doc)| passes_filter(&doc.metadata, filter))
            .map(|(id, doc)| SearchResult {
                chunk_id: id.clone(),
                text: doc.text.clone(),
                metadata: doc.metadata.clone(),
                score: cosine_similarity(query_embedding, &doc.embedding),
            })
            .filter(|r| r.score >= similarity_threshold)
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        let index = self.lexical_index();
        let hits = index.search(query, top_k * 4);
        let max_score = hits.iter().map(|(_, s)| *s).fold(0.0_f32, f32::max).max(1.0);

        let docs = self.docs.read().expect("mock docs lock poisoned");
        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|(id, score)| {
                let doc = docs.get(&id)?;
                if !passes_filter(&doc.metadata, filter) {
                    return None;
                }
                Some(SearchResult {
                    chunk_id: id,
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score: score / max_score,
                })
            })
            .collect();
        results.truncate(top_k);
        Ok(results)
    }

    async fn get_count(&self, filter: &SearchFilter) -> StorageResult<usize> {
        let docs = self.docs.read().expect("mock docs lock poisoned");
        Ok(docs.values().filter(|doc| passes_filter(&doc.metadata, filter)).count())
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let docs = self.docs.read().expect("mock docs lock poisoned");
        Ok(docs.get(chunk_id).map(|doc| SearchResult {
            chunk_id: chunk_id.to_string(),
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            score: 1.0,
        }))
    }

    async fn reset(&self) -> StorageResult<()> {
        self.docs.write().expect("mock docs lock poisoned").clear();
        *self.metadata.write().expect("mock metadata lock poisoned") = None;
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        Ok(self.metadata.read().expect("mock metadata lock poisoned").clone())
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        *self.metadata.write().expect("mock metadata lock poisoned") = Some(metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str, embedding: Vec<f32>) -> UpsertDocument {
        UpsertDocument {
            id: id.to_string(),
            embedding,
            text: text.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_vector_search_ranks_by_similarity() {
        let storage = MockStorage::new();
        storage
            .upsert(&[doc("a", "alpha", vec![1.0, 0.0]), doc("b", "beta", vec![0.0, 1.0])])
            .await
            .expect("upsert");

        let results = storage
            .vector_search(&[1.0, 0.0], 10, 0.0, &SearchFilter::default())
            .await
            .expect("search");
        assert_eq!(results.first().map(|r| r.chunk_id.as_str()), Some("a"));
    }

    #[tokio::test]
    async fn reset_clears_documents_and_metadata() {
        let storage = MockStorage::new();
        storage.upsert(&[doc("a", "alpha", vec![1.0])]).await.expect("upsert");
        storage
            .set_embedding_metadata(EmbeddingMetadata {
                provider: "mock".to_string(),
                model: "mock-1".to_string(),
                dimensions: 1,
            })
            .await
            .expect("set metadata");

        storage.reset().await.expect("reset");

        assert_eq!(storage.get_count(&SearchFilter::default()).await.unwrap(), 0);
        assert!(storage.get_embedding_metadata().await.unwrap().is_none());
    }
}
