//! Chunk and document shapes shared by both chunker strategies.

use serde::{Deserialize, Serialize};

/// Which chunker strategy produced (or should produce) a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Prose,
    Code,
}

/// A loaded document before chunking. Produced by the [`crate::loader::DocumentLoader`].
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub text: String,
    pub source_type: SourceType,
    pub language: Option<String>,
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
}

/// One unit of chunked text ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub file_path: String,
    pub file_name: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub source_type: SourceType,
    pub language: Option<String>,
    pub token_count: usize,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,

    // Code-specific metadata; `None`/empty for prose chunks.
    pub symbol_name: Option<String>,
    pub symbol_type: Option<String>,
    pub parent_symbol: Option<String>,
    pub class_name: Option<String>,
    pub imports: Vec<String>,
    pub docstring: Option<String>,

    /// Populated by the worker when `generate_summaries` is requested.
    pub summary: Option<String>,
}

impl Chunk {
    /// Collapse the metadata fields into a flat map suitable for a storage
    /// backend's opaque `metadata` bag.
    #[must_use]
    pub fn metadata_map(&self) -> std::collections::HashMap<String, serde_json::Value> {
        let mut map = std::collections::HashMap::new();
        map.insert("file_path".to_string(), self.file_path.clone().into());
        map.insert("file_name".to_string(), self.file_name.clone().into());
        map.insert("chunk_index".to_string(), self.chunk_index.into());
        map.insert("total_chunks".to_string(), self.total_chunks.into());
        map.insert(
            "source_type".to_string(),
            match self.source_type {
                SourceType::Prose => "prose",
                SourceType::Code => "code",
            }
            .into(),
        );
        if let Some(language) = &self.language {
            map.insert("language".to_string(), language.clone().into());
        }
        if let Some(start_line) = self.start_line {
            map.insert("start_line".to_string(), start_line.into());
        }
        if let Some(end_line) = self.end_line {
            map.insert("end_line".to_string(), end_line.into());
        }
        if let Some(symbol_name) = &self.symbol_name {
            map.insert("symbol_name".to_string(), symbol_name.clone().into());
        }
        if let Some(symbol_type) = &self.symbol_type {
            map.insert("symbol_type".to_string(), symbol_type.clone().into());
        }
        if let Some(parent_symbol) = &self.parent_symbol {
            map.insert("parent_symbol".to_string(), parent_symbol.clone().into());
        }
        if let Some(class_name) = &self.class_name {
            map.insert("class_name".to_string(), class_name.clone().into());
        }
        if !self.imports.is_empty() {
            map.insert("imports".to_string(), self.imports.clone().into());
        }
        if let Some(docstring) = &self.docstring {
            map.insert("docstring".to_string(), docstring.clone().into());
        }
        if let Some(summary) = &self.summary {
            map.insert("summary".to_string(), summary.clone().into());
        }
        map
    }
}
