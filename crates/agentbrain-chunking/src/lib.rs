//! Document loading, parsing, and chunking.
//!
//! This crate turns files on disk into [`models::Chunk`]s ready for
//! embedding: code files are parsed with tree-sitter and chunked along
//! declaration boundaries, prose files are split recursively by
//! paragraph/sentence/token count.

pub mod chunking;
pub mod error;
pub mod loader;
pub mod models;
pub mod parsing;

pub use chunking::{CodeChunker, ProseChunker, TiktokenCounter, TokenCounter, compute_chunk_id};
pub use error::{ParsingError, ParsingResult};
pub use loader::{DocumentLoader, FsDocumentLoader};
pub use models::{Chunk, LoadedDocument, SourceType};
pub use parsing::{LanguageConfig, get_language_config, get_language_from_extension};
