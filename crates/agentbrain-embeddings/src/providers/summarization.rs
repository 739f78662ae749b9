//! Code summarization provider, used when `generate_summaries` is set.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{EmbeddingError, EmbeddingResult};

#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    async fn summarize(&self, code: &str, language: &str) -> EmbeddingResult<String>;
}

/// Chat-completions-style summarizer, speaking the OpenAI-compatible
/// `/chat/completions` endpoint with a fixed system prompt.
pub struct HttpSummarizationProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpSummarizationProvider {
    #[must_use]
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl SummarizationProvider for HttpSummarizationProvider {
    async fn summarize(&self, code: &str, language: &str) -> EmbeddingResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let prompt = format!(
            "Summarize the purpose of this {language} code in one sentence:\n\n{code}"
        );
        let mut request = self.client.post(&url).json(&serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!(
                "chat completions endpoint returned {status}: {body}"
            )));
        }

        let mut parsed: ChatResponse = response.json().await?;
        let choice = parsed
            .choices
            .pop()
            .ok_or_else(|| EmbeddingError::Provider("empty chat completion response".to_string()))?;
        Ok(choice.message.content.trim().to_string())
    }
}

/// Deterministic summarizer used in tests: returns a fixed-shape sentence
/// derived from the code's line count, with no network call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSummarizationProvider;

#[async_trait]
impl SummarizationProvider for MockSummarizationProvider {
    async fn summarize(&self, code: &str, language: &str) -> EmbeddingResult<String> {
        let lines = code.lines().count();
        Ok(format!("{language} snippet of {lines} line(s)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_summarizer_reports_line_count() {
        let provider = MockSummarizationProvider;
        let summary = provider.summarize("a\nb\nc", "rust").await.unwrap();
        assert_eq!(summary, "rust snippet of 3 line(s)");
    }
}
