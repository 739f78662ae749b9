//! Query service: dispatches to one of five retrieval modes and fuses
//! vector/BM25/graph result lists into a single ranked list.

use std::sync::Arc;
use std::time::Instant;

use agentbrain_embeddings::EmbeddingProvider;
use agentbrain_graph::GraphStore;
use agentbrain_storage::{SearchFilter, StorageBackend};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::fusion::{apply_filters, combine_hybrid, combine_rrf};
use crate::models::{QueryMatch, QueryOutcome, QueryRequest, SearchMode};

/// Dependency-injectable query entry point; [`FusionQueryService`] is the
/// only real implementation, mocked in tests via [`crate::test_utils::MockQueryService`].
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, request: QueryRequest) -> QueryResult<QueryOutcome>;
}

/// The production query service: vector search, BM25, graph lookup, and
/// the hybrid/multi fusion combinators over them.
pub struct FusionQueryService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn StorageBackend>,
    graph_store: Option<Arc<GraphStore>>,
    rrf_k: u32,
}

impl FusionQueryService {
    #[must_use]
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, backend: Arc<dyn StorageBackend>, graph_store: Option<Arc<GraphStore>>, rrf_k: u32) -> Self {
        Self {
            embedding_provider,
            backend,
            graph_store,
            rrf_k,
        }
    }

    fn filter(&self, request: &QueryRequest) -> SearchFilter {
        let file_paths_glob = match request.file_paths.as_deref() {
            Some([single]) => Some(single.clone()),
            _ => None,
        };
        SearchFilter {
            source_types: request.source_types.clone(),
            languages: request.languages.clone(),
            file_paths_glob,
        }
    }

    async fn vector_matches(&self, request: &QueryRequest, top_k: usize) -> QueryResult<Vec<QueryMatch>> {
        let embedding = self.embedding_provider.embed_query(&request.query).await?;
        let filter = self.filter(request);
        let results = self.backend.vector_search(&embedding, top_k, request.similarity_threshold, &filter).await?;
        let matches: Vec<QueryMatch> = results.into_iter().map(QueryMatch::from_vector).collect();
        Ok(apply_filters(matches, &filter, request.file_paths.as_deref()))
    }

    async fn bm25_matches(&self, request: &QueryRequest, top_k: usize) -> QueryResult<Vec<QueryMatch>> {
        let filter = self.filter(request);
        let results = self.backend.keyword_search(&request.query, top_k, &filter).await?;
        let matches: Vec<QueryMatch> = results.into_iter().map(QueryMatch::from_bm25).collect();
        Ok(apply_filters(matches, &filter, request.file_paths.as_deref()))
    }

    async fn graph_matches(&self, request: &QueryRequest, top_k: usize) -> QueryResult<Vec<QueryMatch>> {
        let Some(graph_store) = &self.graph_store else {
            return Err(QueryError::GraphDisabled);
        };
        let triples = graph_store.get_triplets().await;
        let hits = agentbrain_graph::query_triples(&triples, &request.query, top_k);

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(chunk_id) = &hit.source_chunk_id else { continue };
            let Some(chunk) = self.backend.get_by_id(chunk_id).await? else {
                continue;
            };
            matches.push(QueryMatch {
                chunk_id: chunk.chunk_id,
                text: chunk.text,
                metadata: chunk.metadata,
                score: hit.graph_score,
                vector_score: None,
                bm25_score: None,
                graph_score: Some(hit.graph_score),
                related_entities: Some((hit.subject, hit.object)),
                relationship_path: Some(hit.relationship_path),
            });
        }

        let filter = self.filter(request);
        Ok(apply_filters(matches, &filter, request.file_paths.as_deref()))
    }

    async fn corpus_size(&self) -> usize {
        self.backend.get_count(&SearchFilter::default()).await.unwrap_or(0)
    }
}

#[async_trait]
impl QueryService for FusionQueryService {
    async fn query(&self, request: QueryRequest) -> QueryResult<QueryOutcome> {
        let start = Instant::now();
        let top_k = request.top_k.max(1);

        let matches = match request.mode {
            SearchMode::Vector => self.vector_matches(&request, top_k).await?,
            SearchMode::Bm25 => self.bm25_matches(&request, top_k).await?,
            SearchMode::Graph => {
                let hits = self.graph_matches(&request, top_k).await?;
                if hits.is_empty() {
                    debug!("graph mode returned no hits, falling back to vector search");
                    self.vector_matches(&request, top_k).await?
                } else {
                    hits
                }
            }
            SearchMode::Hybrid => {
                let corpus_size = self.corpus_size().await;
                let candidate_k = top_k.min(corpus_size);
                let (vector, bm25) = tokio::try_join!(self.vector_matches(&request, candidate_k), self.bm25_matches(&request, candidate_k))?;
                combine_hybrid(vector, bm25, request.alpha, top_k)
            }
            SearchMode::Multi => {
                let corpus_size = self.corpus_size().await;
                let candidate_k = top_k.min(corpus_size);
                let (vector, bm25) = tokio::try_join!(self.vector_matches(&request, candidate_k), self.bm25_matches(&request, candidate_k))?;
                let mut lists = vec![vector, bm25];
                if self.graph_store.is_some() {
                    match self.graph_matches(&request, candidate_k).await {
                        Ok(graph) => lists.push(graph),
                        Err(QueryError::GraphDisabled) => {}
                        Err(err) => warn!(error = %err, "graph mode contribution to multi-fusion failed, continuing without it"),
                    }
                }
                combine_rrf(lists, self.rrf_k, top_k)
            }
        };

        Ok(QueryOutcome {
            matches,
            query_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agentbrain_embeddings::MockEmbeddingProvider;
    use agentbrain_storage::{MockStorage, UpsertDocument};
    use std::collections::HashMap;

    async fn seeded_backend(dimensions: usize) -> Arc<MockStorage> {
        let backend = Arc::new(MockStorage::new());
        let mut metadata = HashMap::new();
        metadata.insert("source_type".to_string(), serde_json::json!("code"));
        metadata.insert("language".to_string(), serde_json::json!("rust"));
        metadata.insert("file_path".to_string(), serde_json::json!("src/lib.rs"));
        backend
            .upsert(&[UpsertDocument {
                id: "chunk-1".to_string(),
                embedding: vec![1.0; dimensions],
                text: "fn run() {}".to_string(),
                metadata,
            }])
            .await
            .unwrap();
        backend
    }

    fn service(backend: Arc<MockStorage>, graph_store: Option<Arc<GraphStore>>) -> FusionQueryService {
        FusionQueryService::new(Arc::new(MockEmbeddingProvider::new(4)), backend, graph_store, 60)
    }

    #[tokio::test]
    async fn vector_mode_returns_seeded_chunk() {
        let backend = seeded_backend(4).await;
        let svc = service(backend, None);
        let request = QueryRequest::new("run", SearchMode::Vector);
        let outcome = svc.query(request).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].chunk_id, "chunk-1");
    }

    #[tokio::test]
    async fn graph_mode_requires_graph_store() {
        let backend = seeded_backend(4).await;
        let svc = service(backend, None);
        let request = QueryRequest::new("run", SearchMode::Graph);
        let err = svc.query(request).await.unwrap_err();
        assert!(matches!(err, QueryError::GraphDisabled));
    }

    #[tokio::test]
    async fn graph_mode_falls_back_to_vector_when_no_triples_match() {
        let backend = seeded_backend(4).await;
        let graph_dir = tempfile::tempdir().unwrap();
        let graph_store = Arc::new(GraphStore::open(graph_dir.path()).await.unwrap());
        let svc = service(backend, Some(graph_store));
        let request = QueryRequest::new("run", SearchMode::Graph);
        let outcome = svc.query(request).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].chunk_id, "chunk-1");
    }

    #[tokio::test]
    async fn hybrid_mode_fuses_vector_and_bm25() {
        let backend = seeded_backend(4).await;
        let svc = service(backend, None);
        let mut request = QueryRequest::new("run", SearchMode::Hybrid);
        request.alpha = 0.5;
        let outcome = svc.query(request).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert!(outcome.matches[0].vector_score.is_some());
    }
}
