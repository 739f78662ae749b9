//! Graph query: entity-name heuristics over free text, then a scan of the
//! stored triples for subject/object substring matches.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{GraphQueryMatch, GraphTriple};

const MAX_QUERY_ENTITIES: usize = 10;

const STOP_WORDS: &[&str] = &[
    "what", "where", "when", "which", "that", "this", "have", "does", "with", "from", "about", "into",
];

static CAMEL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+[A-Z]").unwrap());
static ALL_CAPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z_]+$").unwrap());
static NOT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());

/// Pull candidate entity names out of a natural-language query: CamelCase
/// words, `ALL_CAPS` constants, capitalized words, `snake_case`
/// identifiers, then any other lowercase word over 3 characters that
/// isn't a stop word. Capped at 10 to bound the number of store scans.
#[must_use]
pub fn extract_query_entities(query_text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let mut seen_lower: HashSet<String> = HashSet::new();

    for word in query_text.split_whitespace() {
        let clean = NOT_WORD.replace_all(word, "").to_string();
        if clean.is_empty() {
            continue;
        }
        let is_candidate = CAMEL_CASE.is_match(&clean)
            || (ALL_CAPS.is_match(&clean) && clean.len() > 2)
            || (clean.chars().next().is_some_and(char::is_uppercase) && clean.len() > 2)
            || (clean.contains('_') && clean.chars().all(|c| !c.is_uppercase()));
        if is_candidate {
            let lower = clean.to_lowercase();
            if seen_lower.insert(lower) {
                entities.push(clean);
            }
        }
    }

    for word in query_text.split_whitespace() {
        let clean = NOT_WORD.replace_all(word, "").to_lowercase();
        if clean.len() > 3 && !STOP_WORDS.contains(&clean.as_str()) && seen_lower.insert(clean.clone()) {
            entities.push(clean);
        }
    }

    entities.truncate(MAX_QUERY_ENTITIES);
    entities
}

/// For each candidate entity, scan `triples` for a case-insensitive
/// substring match on subject or object, yielding up to `top_k` matches
/// per entity, then dedupe across all entities by `source_chunk_id`
/// (falling back to the formatted relationship path when absent).
#[must_use]
pub fn query_triples(triples: &[GraphTriple], query_text: &str, top_k: usize) -> Vec<GraphQueryMatch> {
    let entities = extract_query_entities(query_text);
    let mut results = Vec::new();

    for entity in &entities {
        let needle = entity.to_lowercase();
        let mut matched = 0;
        for triple in triples {
            if matched >= top_k {
                break;
            }
            let hit = triple.subject.to_lowercase().contains(&needle) || triple.object.to_lowercase().contains(&needle);
            if !hit {
                continue;
            }
            matched += 1;
            results.push(GraphQueryMatch {
                entity: entity.clone(),
                subject: triple.subject.clone(),
                predicate: triple.predicate.clone(),
                object: triple.object.clone(),
                source_chunk_id: triple.source_chunk_id.clone(),
                relationship_path: triple.relationship_path(),
                graph_score: 1.0,
            });
        }
    }

    let mut seen = HashSet::new();
    results.retain(|result| {
        let key = result.source_chunk_id.clone().unwrap_or_else(|| result.relationship_path.clone());
        seen.insert(key)
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(subject: &str, predicate: &str, object: &str, chunk: Option<&str>) -> GraphTriple {
        GraphTriple {
            subject: subject.to_string(),
            subject_type: None,
            predicate: predicate.to_string(),
            object: object.to_string(),
            object_type: None,
            source_chunk_id: chunk.map(str::to_string),
        }
    }

    #[test]
    fn camel_case_and_snake_case_are_extracted() {
        let entities = extract_query_entities("How does JobWorker handle cancel_requested?");
        assert!(entities.iter().any(|e| e == "JobWorker"));
        assert!(entities.iter().any(|e| e == "cancel_requested"));
    }

    #[test]
    fn stop_words_are_excluded() {
        let entities = extract_query_entities("what does this do");
        assert!(!entities.iter().any(|e| e == "what" || e == "does" || e == "this"));
    }

    #[test]
    fn query_matches_and_dedupes_by_chunk_id() {
        let triples = vec![
            triple("JobWorker", "calls", "JobQueueStore", Some("c1")),
            triple("JobWorker", "imports", "tokio", Some("c1")),
        ];
        let matches = query_triples(&triples, "JobWorker", 10);
        assert_eq!(matches.len(), 1);
    }
}
