//! Score normalization and list fusion for hybrid/multi query modes.

use std::collections::HashMap;

use agentbrain_storage::SearchFilter;

use crate::models::QueryMatch;

/// Apply `source_type`/`language`/`file_paths` filters to a list already
/// retrieved from the backend. A backstop for modes (graph) that can't push
/// filters down to a single backend call.
pub fn apply_filters(matches: Vec<QueryMatch>, filter: &SearchFilter, file_paths: Option<&[String]>) -> Vec<QueryMatch> {
    matches
        .into_iter()
        .filter(|m| {
            if let Some(source_types) = &filter.source_types {
                let ok = m
                    .metadata
                    .get("source_type")
                    .and_then(|v| v.as_str())
                    .is_some_and(|st| source_types.iter().any(|t| t == st));
                if !ok {
                    return false;
                }
            }
            if let Some(languages) = &filter.languages {
                let ok = m
                    .metadata
                    .get("language")
                    .and_then(|v| v.as_str())
                    .is_some_and(|lang| languages.iter().any(|l| l == lang));
                if !ok {
                    return false;
                }
            }
            if let Some(patterns) = file_paths
                && !patterns.is_empty()
                && !m.matches_file_paths(patterns)
            {
                return false;
            }
            true
        })
        .collect()
}

fn max_score(matches: &[QueryMatch]) -> f32 {
    matches.iter().map(|m| m.score).fold(0.0_f32, f32::max)
}

/// Weighted-sum fusion of a vector list and a BM25 list. Each list is
/// normalized by dividing by its own max score before weighting.
#[must_use]
pub fn combine_hybrid(vector: Vec<QueryMatch>, bm25: Vec<QueryMatch>, alpha: f32, top_k: usize) -> Vec<QueryMatch> {
    let vector_max = max_score(&vector);
    let bm25_max = max_score(&bm25);

    let mut canonical: HashMap<String, QueryMatch> = HashMap::new();
    let mut scores: HashMap<String, f32> = HashMap::new();

    for m in vector {
        let normalized = if vector_max > 0.0 { m.score / vector_max } else { 0.0 };
        *scores.entry(m.chunk_id.clone()).or_insert(0.0) += alpha * normalized;
        canonical.entry(m.chunk_id.clone()).or_insert(m);
    }
    for m in bm25 {
        let normalized = if bm25_max > 0.0 { m.score / bm25_max } else { 0.0 };
        *scores.entry(m.chunk_id.clone()).or_insert(0.0) += (1.0 - alpha) * normalized;
        canonical
            .entry(m.chunk_id.clone())
            .and_modify(|existing| existing.bm25_score = Some(m.score))
            .or_insert(m);
    }

    finalize(canonical, scores, top_k)
}

/// Reciprocal Rank Fusion across any number of ranked lists. Rank 0 is best
/// in each input list; `k_rrf` is the RRF smoothing constant (60 by default).
#[must_use]
pub fn combine_rrf(lists: Vec<Vec<QueryMatch>>, k_rrf: u32, top_k: usize) -> Vec<QueryMatch> {
    let mut canonical: HashMap<String, QueryMatch> = HashMap::new();
    let mut scores: HashMap<String, f32> = HashMap::new();

    for list in lists {
        for (rank, m) in list.into_iter().enumerate() {
            let contribution = 1.0 / (k_rrf as f32 + rank as f32 + 1.0);
            *scores.entry(m.chunk_id.clone()).or_insert(0.0) += contribution;
            canonical
                .entry(m.chunk_id.clone())
                .and_modify(|existing| merge_graph_fields(existing, &m))
                .or_insert(m);
        }
    }

    finalize(canonical, scores, top_k)
}

fn merge_graph_fields(existing: &mut QueryMatch, other: &QueryMatch) {
    if existing.graph_score.is_none() && other.graph_score.is_some() {
        existing.graph_score = other.graph_score;
        existing.related_entities = other.related_entities.clone();
        existing.relationship_path = other.relationship_path.clone();
    }
    if existing.vector_score.is_none() {
        existing.vector_score = other.vector_score;
    }
    if existing.bm25_score.is_none() {
        existing.bm25_score = other.bm25_score;
    }
}

fn finalize(canonical: HashMap<String, QueryMatch>, scores: HashMap<String, f32>, top_k: usize) -> Vec<QueryMatch> {
    let mut results: Vec<QueryMatch> = canonical
        .into_iter()
        .map(|(id, mut m)| {
            m.score = scores.get(&id).copied().unwrap_or(0.0);
            m
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_match(id: &str, score: f32) -> QueryMatch {
        QueryMatch {
            chunk_id: id.to_string(),
            text: format!("text for {id}"),
            metadata: HashMap::new(),
            score,
            vector_score: None,
            bm25_score: None,
            graph_score: None,
            related_entities: None,
            relationship_path: None,
        }
    }

    #[test]
    fn hybrid_weights_normalized_scores() {
        let vector = vec![query_match("a", 0.8), query_match("b", 0.4)];
        let bm25 = vec![query_match("a", 10.0), query_match("c", 5.0)];

        let combined = combine_hybrid(vector, bm25, 0.5, 10);
        let a = combined.iter().find(|m| m.chunk_id == "a").unwrap();
        // a: 0.5 * (0.8/0.8) + 0.5 * (10/10) = 1.0
        assert!((a.score - 1.0).abs() < 1e-6);
        assert_eq!(a.vector_score, Some(0.8));
        assert_eq!(a.bm25_score, Some(10.0));
    }

    #[test]
    fn hybrid_truncates_to_top_k() {
        let vector = vec![query_match("a", 1.0), query_match("b", 0.5), query_match("c", 0.2)];
        let combined = combine_hybrid(vector, Vec::new(), 0.5, 2);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].chunk_id, "a");
    }

    #[test]
    fn rrf_rewards_chunks_present_in_multiple_lists() {
        let vector = vec![query_match("a", 0.9), query_match("b", 0.8)];
        let bm25 = vec![query_match("b", 5.0), query_match("a", 4.0)];
        let combined = combine_rrf(vec![vector, bm25], 60, 10);
        // both appear in both lists at different ranks; order depends on rank sums.
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn rrf_merges_graph_fields_onto_canonical_result() {
        let mut with_graph = query_match("a", 1.0);
        with_graph.graph_score = Some(1.0);
        with_graph.relationship_path = Some("A --imports--> B".to_string());

        let vector = vec![query_match("a", 0.9)];
        let graph = vec![with_graph];
        let combined = combine_rrf(vec![vector, graph], 60, 10);

        let a = combined.iter().find(|m| m.chunk_id == "a").unwrap();
        assert_eq!(a.graph_score, Some(1.0));
        assert_eq!(a.relationship_path.as_deref(), Some("A --imports--> B"));
    }

    #[test]
    fn apply_filters_respects_file_path_glob() {
        let mut m = query_match("a", 1.0);
        m.metadata.insert("file_path".to_string(), serde_json::json!("src/lib.rs"));
        let filter = SearchFilter::default();
        let kept = apply_filters(vec![m], &filter, Some(&["src/**".to_string()]));
        assert_eq!(kept.len(), 1);

        let mut m2 = query_match("b", 1.0);
        m2.metadata.insert("file_path".to_string(), serde_json::json!("docs/readme.md"));
        let dropped = apply_filters(vec![m2], &filter, Some(&["src/**".to_string()]));
        assert!(dropped.is_empty());
    }
}
