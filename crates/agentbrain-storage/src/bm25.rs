//! In-memory BM25+ lexical index backing the columnar/embedded storage backend.
//!
//! Qdrant has no native full-text scoring, so the columnar backend keeps a
//! small inverted index alongside it and rebuilds it from the stored
//! documents whenever `reindex` is called. The rebuild is expected to run on
//! a blocking thread pool; this module itself does no I/O.

use std::collections::{HashMap, HashSet};

const TOKEN_PATTERN: &str = r"[A-Za-z0-9_]+";

/// Lower-bound correction added to every scored term so long documents
/// aren't penalized to near-zero relevance relative to short ones.
const DELTA: f64 = 1.0;

/// One document tracked by the index: its raw text split into lowercase tokens.
struct IndexedDoc {
    term_freqs: HashMap<String, usize>,
    length: usize,
}

/// BM25+ ranking over a fixed document set (Robertson/Sparck-Jones BM25 plus
/// the Lv & Zhai lower-bound `delta` term).
pub struct Bm25Index {
    k1: f64,
    b: f64,
    docs: HashMap<String, IndexedDoc>,
    doc_freq: HashMap<String, usize>,
    total_length: usize,
    token_re: regex::Regex,
}

impl Bm25Index {
    #[must_use]
    pub fn new(k1: f64, b: f64) -> Self {
        Self {
            k1,
            b,
            docs: HashMap::new(),
            doc_freq: HashMap::new(),
            total_length: 0,
            token_re: regex::Regex::new(TOKEN_PATTERN).expect("static token pattern is valid"),
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        self.token_re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Replace the entire index contents with the given `(id, text)` pairs.
    pub fn rebuild<'a>(&mut self, documents: impl Iterator<Item = (&'a str, &'a str)>) {
        self.docs.clear();
        self.doc_freq.clear();
        self.total_length = 0;

        for (id, text) in documents {
            let tokens = self.tokenize(text);
            let mut term_freqs: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            self.total_length += tokens.len();
            self.docs.insert(
                id.to_string(),
                IndexedDoc {
                    term_freqs,
                    length: tokens.len(),
                },
            );
        }
    }

    fn avg_doc_len(&self) -> f64 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.docs.len() as f64
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document against `query`, returning `(id, score)` pairs
    /// with a positive score, sorted descending.
    #[must_use]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        self.search_within(query, top_k, None)
    }

    /// Like [`Self::search`], but when `candidate_ids` is given, only those
    /// documents are scored — letting a metadata filter narrow the corpus
    /// before ranking instead of truncating matches after the fact.
    #[must_use]
    pub fn search_within(
        &self,
        query: &str,
        top_k: usize,
        candidate_ids: Option<&HashSet<String>>,
    ) -> Vec<(String, f32)> {
        let query_terms = self.tokenize(query);
        if query_terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }
        let avg_len = self.avg_doc_len();

        let mut scores: Vec<(String, f32)> = self
            .docs
            .iter()
            .filter(|(id, _)| candidate_ids.is_none_or(|ids| ids.contains(id.as_str())))
            .filter_map(|(id, doc)| {
                let mut score = 0.0;
                for term in &query_terms {
                    let Some(&tf) = doc.term_freqs.get(term) else {
                        continue;
                    };
                    let tf = tf as f64;
                    let idf = self.idf(term);
                    let denom =
                        tf + self.k1 * (1.0 - self.b + self.b * (doc.length as f64 / avg_len.max(1.0)));
                    score += idf * (DELTA + (tf * (self.k1 + 1.0)) / denom);
                }
                (score > 0.0).then_some((id.clone(), score as f32))
            })
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(top_k);
        scores
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_exact_term_match_higher() {
        let mut index = Bm25Index::new(1.5, 0.75);
        index.rebuild(
            vec![
                ("a", "fn parse_tokens(input: &str) -> Vec<Token>"),
                ("b", "fn render_html(doc: &Document) -> String"),
            ]
            .into_iter(),
        );

        let results = index.search("parse tokens", 10);
        assert_eq!(results.first().map(|(id, _)| id.as_str()), Some("a"));
    }

    #[test]
    fn empty_query_returns_nothing() {
        let mut index = Bm25Index::new(1.5, 0.75);
        index.rebuild(vec![("a", "some text")].into_iter());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn rebuild_replaces_prior_contents() {
        let mut index = Bm25Index::new(1.5, 0.75);
        index.rebuild(vec![("a", "alpha beta")].into_iter());
        assert_eq!(index.len(), 1);
        index.rebuild(vec![("b", "gamma delta")].into_iter());
        assert_eq!(index.len(), 1);
        assert!(index.search("alpha", 10).is_empty());
    }

    #[test]
    fn search_within_restricts_to_candidate_ids() {
        let mut index = Bm25Index::new(1.5, 0.75);
        index.rebuild(
            vec![("a", "fn parse_tokens()"), ("b", "fn parse_tokens_v2()")].into_iter(),
        );

        let candidates: HashSet<String> = ["b".to_string()].into_iter().collect();
        let results = index.search_within("parse tokens", 10, Some(&candidates));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "b");
    }

    #[test]
    fn long_matching_document_still_scores_above_zero() {
        let mut index = Bm25Index::new(1.5, 0.75);
        let long_doc = "word ".repeat(500) + "needle";
        index.rebuild(vec![("short", "needle"), ("long", long_doc.as_str())].into_iter());

        let results = index.search("needle", 10);
        let long_score = results.iter().find(|(id, _)| id == "long").map(|(_, s)| *s);
        assert!(long_score.is_some_and(|s| s > 0.0));
    }
}
