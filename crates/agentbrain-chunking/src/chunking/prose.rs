//! Recursive prose chunker: paragraph, then sentence, then token-count
//! splitting, with `chunk_overlap` tokens of shared text between
//! consecutive chunks.

use crate::chunking::chunk_id::compute_chunk_id;
use crate::chunking::traits::TokenCounter;
use crate::models::{Chunk, SourceType};

pub struct ProseChunker<'a> {
    token_counter: &'a dyn TokenCounter,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl<'a> ProseChunker<'a> {
    #[must_use]
    pub fn new(token_counter: &'a dyn TokenCounter, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            token_counter,
            chunk_size,
            chunk_overlap,
        }
    }

    #[must_use]
    pub fn chunk(&self, text: &str, file_path: &str, file_name: &str) -> Vec<Chunk> {
        let segments = split_into_segments(text, self.chunk_size, self.token_counter);
        let windows = apply_overlap(&segments, self.chunk_overlap, self.token_counter);

        let total = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let token_count = self.token_counter.count(&text);
                Chunk {
                    chunk_id: compute_chunk_id(file_path, index),
                    text,
                    file_path: file_path.to_string(),
                    file_name: file_name.to_string(),
                    chunk_index: index,
                    total_chunks: total,
                    source_type: SourceType::Prose,
                    language: None,
                    token_count,
                    start_line: None,
                    end_line: None,
                    symbol_name: None,
                    symbol_type: None,
                    parent_symbol: None,
                    class_name: None,
                    imports: Vec::new(),
                    docstring: None,
                    summary: None,
                }
            })
            .collect()
    }
}

/// Split text into segments each under `chunk_size` tokens, splitting
/// first on paragraph breaks, then sentence boundaries, then raw token
/// count as a last resort.
fn split_into_segments(text: &str, chunk_size: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let candidate = if current.is_empty() {
            paragraph.to_string()
        } else {
            format!("{current}\n\n{paragraph}")
        };

        if counter.count(&candidate) <= chunk_size {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }

        if counter.count(paragraph) <= chunk_size {
            current = paragraph.to_string();
        } else {
            segments.extend(split_by_sentence(paragraph, chunk_size, counter));
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    if segments.is_empty() && !text.trim().is_empty() {
        segments.extend(split_by_sentence(text.trim(), chunk_size, counter));
    }

    segments
}

fn split_by_sentence(paragraph: &str, chunk_size: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let sentences: Vec<&str> = paragraph
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut segments = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        let candidate = if current.is_empty() {
            sentence.to_string()
        } else {
            format!("{current} {sentence}")
        };

        if counter.count(&candidate) <= chunk_size {
            current = candidate;
        } else {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            if counter.count(sentence) <= chunk_size {
                current = sentence.to_string();
            } else {
                segments.extend(split_by_token_count(sentence, chunk_size, counter));
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Last-resort splitter: chop by whitespace-delimited words until the
/// running token count would exceed `chunk_size`.
fn split_by_token_count(text: &str, chunk_size: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut segments = Vec::new();
    let mut current_words: Vec<&str> = Vec::new();

    for word in words {
        current_words.push(word);
        let candidate = current_words.join(" ");
        if counter.count(&candidate) > chunk_size && current_words.len() > 1 {
            current_words.pop();
            segments.push(current_words.join(" "));
            current_words = vec![word];
        }
    }
    if !current_words.is_empty() {
        segments.push(current_words.join(" "));
    }
    segments
}

/// Prepend the trailing `chunk_overlap` tokens of each segment onto the
/// next one, so consecutive chunks share context.
fn apply_overlap(segments: &[String], chunk_overlap: usize, counter: &dyn TokenCounter) -> Vec<String> {
    if chunk_overlap == 0 || segments.len() < 2 {
        return segments.to_vec();
    }

    let mut result = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            result.push(segment.clone());
            continue;
        }
        let prev_tail = trailing_tokens(&segments[i - 1], chunk_overlap, counter);
        if prev_tail.is_empty() {
            result.push(segment.clone());
        } else {
            result.push(format!("{prev_tail}\n\n{segment}"));
        }
    }
    result
}

fn trailing_tokens(text: &str, chunk_overlap: usize, counter: &dyn TokenCounter) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }
    let mut start = words.len();
    while start > 0 {
        let candidate = words[start - 1..].join(" ");
        if counter.count(&candidate) > chunk_overlap {
            break;
        }
        start -= 1;
    }
    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordCounter;
    impl TokenCounter for WordCounter {
        fn name(&self) -> &str {
            "word-counter"
        }
        fn max_tokens(&self) -> usize {
            8192
        }
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let counter = WordCounter;
        let chunker = ProseChunker::new(&counter, 100, 0);
        let chunks = chunker.chunk("one two three", "doc.md", "doc.md");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].source_type, SourceType::Prose);
    }

    #[test]
    fn long_text_splits_on_paragraphs() {
        let counter = WordCounter;
        let chunker = ProseChunker::new(&counter, 5, 0);
        let text = "one two three four five\n\nsix seven eight nine ten";
        let chunks = chunker.chunk(text, "doc.md", "doc.md");
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn overlap_shares_trailing_words_between_chunks() {
        let counter = WordCounter;
        let chunker = ProseChunker::new(&counter, 5, 2);
        let text = "one two three four five\n\nsix seven eight nine ten";
        let chunks = chunker.chunk(text, "doc.md", "doc.md");
        assert!(chunks.len() >= 2);
        assert!(chunks[1].text.starts_with("four five") || chunks[1].text.contains("four five"));
    }

    #[test]
    fn chunk_ids_are_stable_across_runs() {
        let counter = WordCounter;
        let chunker = ProseChunker::new(&counter, 100, 0);
        let a = chunker.chunk("hello world", "doc.md", "doc.md");
        let b = chunker.chunk("hello world", "doc.md", "doc.md");
        assert_eq!(a[0].chunk_id, b[0].chunk_id);
    }
}
