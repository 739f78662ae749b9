//! Optional LLM-based triple extraction.
//!
//! Sends a bounded slice of chunk text to a chat-completions-style model
//! and parses `subject | predicate | object` (or the 5-part form with
//! types) lines back into triples. Degrades to an empty result whenever
//! the provider is unavailable, unauthorized, or returns something that
//! doesn't parse.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::GraphTriple;

const MAX_EXTRACTION_CHARS: usize = 4000;

#[async_trait]
pub trait LlmTripleExtractor: Send + Sync {
    async fn extract_triplets(&self, text: &str, max_triplets: usize, source_chunk_id: Option<&str>) -> Vec<GraphTriple>;
}

pub struct HttpLlmTripleExtractor {
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

impl HttpLlmTripleExtractor {
    #[must_use]
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn build_prompt(text: &str, max_triplets: usize) -> String {
        format!(
            "Extract key entity relationships from the following text.\n\
             Return up to {max_triplets} triplets in the format:\n\
             SUBJECT | SUBJECT_TYPE | PREDICATE | OBJECT | OBJECT_TYPE\n\n\
             One triplet per line, only output triplets, no explanations.\n\n\
             Text:\n{text}\n\nTriplets:"
        )
    }
}

#[async_trait]
impl LlmTripleExtractor for HttpLlmTripleExtractor {
    async fn extract_triplets(&self, text: &str, max_triplets: usize, source_chunk_id: Option<&str>) -> Vec<GraphTriple> {
        let truncated = text.get(..MAX_EXTRACTION_CHARS).unwrap_or(text);

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let prompt = Self::build_prompt(truncated, max_triplets);
        let mut request = self.client.post(&url).json(&serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(status = %response.status(), "llm triple extraction request failed");
                return Vec::new();
            }
            Err(err) => {
                debug!(error = %err, "llm triple extraction request errored");
                return Vec::new();
            }
        };

        let Ok(parsed) = response.json::<ChatResponse>().await else {
            return Vec::new();
        };
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Vec::new();
        };

        parse_triplet_lines(&choice.message.content, source_chunk_id)
    }
}

/// Always returns an empty list. Used when LLM extraction is disabled or
/// no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLlmTripleExtractor;

#[async_trait]
impl LlmTripleExtractor for NullLlmTripleExtractor {
    async fn extract_triplets(&self, _text: &str, _max_triplets: usize, _source_chunk_id: Option<&str>) -> Vec<GraphTriple> {
        Vec::new()
    }
}

fn parse_triplet_lines(response: &str, source_chunk_id: Option<&str>) -> Vec<GraphTriple> {
    let mut triplets = Vec::new();
    for line in response.trim().lines() {
        let line = line.trim();
        if line.is_empty() || !line.contains('|') {
            continue;
        }
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let triple = match parts.len() {
            3 => GraphTriple {
                subject: parts[0].to_string(),
                subject_type: None,
                predicate: parts[1].to_string(),
                object: parts[2].to_string(),
                object_type: None,
                source_chunk_id: source_chunk_id.map(str::to_string),
            },
            n if n >= 5 => GraphTriple {
                subject: parts[0].to_string(),
                subject_type: non_empty(parts[1]),
                predicate: parts[2].to_string(),
                object: parts[3].to_string(),
                object_type: non_empty(parts[4]),
                source_chunk_id: source_chunk_id.map(str::to_string),
            },
            _ => continue,
        };
        if triple.subject.is_empty() || triple.predicate.is_empty() || triple.object.is_empty() {
            continue;
        }
        triplets.push(triple);
    }
    triplets
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_part_lines() {
        let triplets = parse_triplet_lines("Worker | calls | Queue", Some("c1"));
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject, "Worker");
        assert_eq!(triplets[0].object, "Queue");
    }

    #[test]
    fn parses_five_part_lines_with_types() {
        let triplets = parse_triplet_lines("Worker | Class | calls | Queue | Struct", None);
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject_type.as_deref(), Some("Class"));
    }

    #[test]
    fn ignores_malformed_lines() {
        let triplets = parse_triplet_lines("not a triple\nalso not one |", None);
        assert!(triplets.is_empty());
    }

    #[tokio::test]
    async fn null_extractor_always_returns_empty() {
        let extractor = NullLlmTripleExtractor;
        let result = extractor.extract_triplets("anything", 5, None).await;
        assert!(result.is_empty());
    }
}
