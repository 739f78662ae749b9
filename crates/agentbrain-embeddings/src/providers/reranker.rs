//! Reranker provider. Not wired into any query mode yet; the trait exists
//! so a cross-encoder reranking pass can be dropped into hybrid/multi
//! fusion later without changing the storage or query contracts.

use async_trait::async_trait;

use crate::error::EmbeddingResult;

#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Reorder `candidates` by relevance to `query`, returning their
    /// original indices in best-to-worst order.
    async fn rerank(&self, query: &str, candidates: &[String]) -> EmbeddingResult<Vec<usize>>;
}

/// Pass-through reranker: preserves input order. Used wherever a
/// `RerankerProvider` is required but no real implementation is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughReranker;

#[async_trait]
impl RerankerProvider for PassThroughReranker {
    async fn rerank(&self, _query: &str, candidates: &[String]) -> EmbeddingResult<Vec<usize>> {
        Ok((0..candidates.len()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pass_through_preserves_order() {
        let reranker = PassThroughReranker;
        let order = reranker
            .rerank("query", &["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
