//! Token counting abstraction shared by both chunker strategies.

pub trait TokenCounter: Send + Sync {
    /// Model or encoding name this counter targets.
    fn name(&self) -> &str;

    /// Maximum tokens the associated model family accepts.
    fn max_tokens(&self) -> usize;

    /// Count tokens in a single string.
    fn count(&self, text: &str) -> usize;

    /// Count tokens for a batch of strings.
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|text| self.count(text)).collect()
    }
}
