//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::{EmbeddingProvider, ProgressCallback};

const DEFAULT_BATCH_SIZE: usize = 64;

/// Embedding client for any OpenAI-compatible embeddings API.
///
/// Requests are `POST {base_url}/embeddings` with body `{model, input}`
/// and an optional `Authorization: Bearer {api_key}` header.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

impl HttpEmbeddingProvider {
    #[must_use]
    pub fn new(base_url: String, api_key: Option<String>, model: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            dimensions,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_batch(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": self.model, "input": inputs }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!(
                "embeddings endpoint returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingsResponse = response.json().await?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Provider("empty embeddings response".to_string()))
    }

    async fn embed_texts(
        &self,
        texts: &[String],
        progress: Option<ProgressCallback<'_>>,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let mut embeddings = self.embed_batch(batch).await?;
            results.append(&mut embeddings);
            if let Some(callback) = progress {
                callback(results.len(), texts.len());
            }
            debug!(batch = batch.len(), total = texts.len(), "embedded batch");
        }
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "http"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
