//! AST-aware code chunker.
//!
//! Groups top-level declarations (functions, types, impls, modules...)
//! into chunks bounded by `chunk_lines` and `max_chars`. A declaration
//! that exceeds both limits on its own is split at its next inner
//! boundary (e.g. the methods of an oversized `impl` block each become
//! their own chunk). Files with no AST support, or whose AST parse
//! fails, fall back to a plain line-window chunker.

use std::collections::HashMap;

use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIteratorMut};

use crate::chunking::chunk_id::compute_chunk_id;
use crate::error::{ParsingError, ParsingResult};
use crate::models::{Chunk, SourceType};
use crate::parsing::{get_language_config, LanguageConfig};

const DEFAULT_CHUNK_LINES: usize = 80;
const DEFAULT_MAX_CHARS: usize = 4000;

pub struct CodeChunker {
    chunk_lines: usize,
    max_chars: usize,
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self {
            chunk_lines: DEFAULT_CHUNK_LINES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

struct Declaration {
    symbol_type: String,
    symbol_name: Option<String>,
    parent_symbol: Option<String>,
    class_name: Option<String>,
    start_byte: usize,
    end_byte: usize,
    start_line: usize,
    end_line: usize,
    docstring: Option<String>,
}

impl CodeChunker {
    #[must_use]
    pub fn new(chunk_lines: usize, max_chars: usize) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
            max_chars: max_chars.max(1),
        }
    }

    /// Chunk `text` as `language`. Falls back to a line-window chunker if
    /// the language has no tree-sitter support or the parse fails.
    pub fn chunk(&self, text: &str, language: &str, file_path: &str, file_name: &str) -> Vec<Chunk> {
        match get_language_config(language).and_then(|cfg| {
            cfg.tree_sitter_language.as_ref()?;
            self.chunk_with_ast(text, cfg, file_path, file_name).ok()
        }) {
            Some(chunks) if !chunks.is_empty() => chunks,
            _ => self.line_window_fallback(text, Some(language), file_path, file_name),
        }
    }

    fn chunk_with_ast(
        &self,
        text: &str,
        config: &LanguageConfig,
        file_path: &str,
        file_name: &str,
    ) -> ParsingResult<Vec<Chunk>> {
        let language = config
            .tree_sitter_language
            .clone()
            .ok_or_else(|| ParsingError::LanguageUnsupported(config.id.to_string()))?;
        let query_src = config
            .tree_sitter_query
            .ok_or_else(|| ParsingError::LanguageUnsupported(config.id.to_string()))?;

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParsingError::TreeSitterError(e.to_string()))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| ParsingError::ParseError("tree-sitter returned no tree".to_string()))?;

        let query = Query::new(&language, query_src)
            .map_err(|e| ParsingError::QueryCompilationError(e.to_string()))?;

        let root = tree.root_node();
        let mut by_id: HashMap<usize, (String, Node)> = HashMap::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, text.as_bytes());
        while let Some(m) = matches.next_mut() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize].to_string();
                by_id.insert(capture.node.id(), (name, capture.node));
            }
        }

        let imports = extract_imports(text, config);

        let mut declarations: Vec<Declaration> = by_id
            .values()
            .map(|(capture_name, node)| build_declaration(*node, capture_name, text, &by_id))
            .collect();
        declarations.sort_by_key(|d| d.start_byte);

        if declarations.is_empty() {
            return Ok(Vec::new());
        }

        let groups = group_declarations(&declarations, self.chunk_lines, self.max_chars, text);

        let total = groups.len();
        let chunks = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| {
                let chunk_text = text[group.start_byte..group.end_byte].to_string();
                Chunk {
                    chunk_id: compute_chunk_id(file_path, index),
                    text: chunk_text,
                    file_path: file_path.to_string(),
                    file_name: file_name.to_string(),
                    chunk_index: index,
                    total_chunks: total,
                    source_type: SourceType::Code,
                    language: Some(config.id.to_string()),
                    token_count: 0,
                    start_line: Some(group.start_line),
                    end_line: Some(group.end_line),
                    symbol_name: group.symbol_name,
                    symbol_type: group.symbol_type,
                    parent_symbol: group.parent_symbol,
                    class_name: group.class_name,
                    imports: imports.clone(),
                    docstring: group.docstring,
                    summary: None,
                }
            })
            .collect();

        Ok(chunks)
    }

    /// Plain line-window chunker used when AST parsing is unavailable or
    /// fails, and for any extension with no registered language.
    #[must_use]
    pub fn line_window_fallback(
        &self,
        text: &str,
        language: Option<&str>,
        file_path: &str,
        file_name: &str,
    ) -> Vec<Chunk> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut windows = Vec::new();
        let mut start = 0;
        while start < lines.len() {
            let end = (start + self.chunk_lines).min(lines.len());
            windows.push((start, end));
            start = end;
        }

        let total = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(index, (start_idx, end_idx))| {
                let chunk_text = lines[start_idx..end_idx].join("\n");
                Chunk {
                    chunk_id: compute_chunk_id(file_path, index),
                    text: chunk_text,
                    file_path: file_path.to_string(),
                    file_name: file_name.to_string(),
                    chunk_index: index,
                    total_chunks: total,
                    source_type: SourceType::Code,
                    language: language.map(str::to_string),
                    token_count: 0,
                    start_line: Some(start_idx + 1),
                    end_line: Some(end_idx),
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

fn build_declaration(
    node: Node,
    capture_name: &str,
    text: &str,
    by_id: &HashMap<usize, (String, Node)>,
) -> Declaration {
    let symbol_name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(text.as_bytes()).ok())
        .map(str::to_string);

    let mut parent_symbol = None;
    let mut class_name = None;
    let mut ancestor = node.parent();
    while let Some(candidate) = ancestor {
        if let Some((parent_capture, parent_node)) = by_id.get(&candidate.id()) {
            parent_symbol = parent_node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(text.as_bytes()).ok())
                .map(str::to_string);
            if matches!(parent_capture.as_str(), "impl" | "class") {
                class_name.clone_from(&parent_symbol);
            }
            break;
        }
        ancestor = candidate.parent();
    }

    let docstring = preceding_doc_comment(node, text);

    Declaration {
        symbol_type: capture_name.to_string(),
        symbol_name,
        parent_symbol,
        class_name,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        docstring,
    }
}

/// Walk backwards over the node's preceding siblings collecting
/// consecutive comment lines immediately above it.
fn preceding_doc_comment(node: Node, text: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut sibling = node.prev_sibling();
    while let Some(candidate) = sibling {
        let kind = candidate.kind();
        if kind.contains("comment") {
            if let Ok(line) = candidate.utf8_text(text.as_bytes()) {
                lines.push(line.trim().to_string());
            }
            sibling = candidate.prev_sibling();
        } else {
            break;
        }
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

/// Collect import/use statements from the first handful of lines,
/// language-agnostic enough to work across the supported grammars.
fn extract_imports(text: &str, config: &LanguageConfig) -> Vec<String> {
    let prefixes: &[&str] = match config.id {
        "rust" => &["use "],
        "python" => &["import ", "from "],
        "javascript" | "typescript" | "tsx" => &["import ", "const ", "require("],
        "go" => &["import "],
        _ => &[],
    };
    if prefixes.is_empty() {
        return Vec::new();
    }
    text.lines()
        .take(200)
        .map(str::trim)
        .filter(|line| prefixes.iter().any(|p| line.starts_with(p)))
        .map(str::to_string)
        .collect()
}

struct DeclarationGroup {
    start_byte: usize,
    end_byte: usize,
    start_line: usize,
    end_line: usize,
    symbol_name: Option<String>,
    symbol_type: Option<String>,
    parent_symbol: Option<String>,
    class_name: Option<String>,
    docstring: Option<String>,
}

/// Group consecutive top-level declarations into chunks bounded by line
/// count and character count; a declaration too large to fit alone keeps
/// its nested declarations (already present in `declarations`, since the
/// query captures both the container and its members) as separate groups.
fn group_declarations(
    declarations: &[Declaration],
    chunk_lines: usize,
    max_chars: usize,
    text: &str,
) -> Vec<DeclarationGroup> {
    // Only consider declarations with no parent as grouping anchors;
    // nested ones are folded into their parent's span unless the parent
    // alone already exceeds the limit, in which case the nested
    // declaration becomes its own group.
    let top_level: Vec<&Declaration> = declarations.iter().filter(|d| d.parent_symbol.is_none()).collect();

    let mut groups = Vec::new();
    let mut current: Option<DeclarationGroup> = None;

    for decl in top_level {
        let decl_chars = decl.end_byte - decl.start_byte;
        let decl_lines = decl.end_line - decl.start_line + 1;

        if decl_chars > max_chars || decl_lines > chunk_lines {
            if let Some(group) = current.take() {
                groups.push(group);
            }
            // Oversized declaration: split at its nested boundaries if any.
            let nested: Vec<&Declaration> = declarations
                .iter()
                .filter(|d| d.parent_symbol.as_deref() == decl.symbol_name.as_deref() && !std::ptr::eq(*d, decl))
                .collect();
            if nested.is_empty() {
                groups.push(declaration_to_group(decl));
            } else {
                for member in nested {
                    groups.push(declaration_to_group(member));
                }
            }
            continue;
        }

        match &mut current {
            Some(group) => {
                let candidate_chars = decl.end_byte - group.start_byte;
                let candidate_lines = decl.end_line - group.start_line + 1;
                if candidate_chars <= max_chars && candidate_lines <= chunk_lines {
                    group.end_byte = decl.end_byte;
                    group.end_line = decl.end_line;
                } else {
                    groups.push(current.take().unwrap());
                    current = Some(declaration_to_group(decl));
                }
            }
            None => current = Some(declaration_to_group(decl)),
        }
    }
    if let Some(group) = current {
        groups.push(group);
    }

    let _ = text;
    groups
}

fn declaration_to_group(decl: &Declaration) -> DeclarationGroup {
    DeclarationGroup {
        start_byte: decl.start_byte,
        end_byte: decl.end_byte,
        start_line: decl.start_line,
        end_line: decl.end_line,
        symbol_name: decl.symbol_name.clone(),
        symbol_type: Some(decl.symbol_type.clone()),
        parent_symbol: decl.parent_symbol.clone(),
        class_name: decl.class_name.clone(),
        docstring: decl.docstring.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_rust_functions() {
        let chunker = CodeChunker::default();
        let text = "fn one() {}\n\nfn two() {}\n";
        let chunks = chunker.chunk(text, "rust", "lib.rs", "lib.rs");
        assert!(!chunks.is_empty());
        assert!(chunks.iter().any(|c| c.symbol_name.as_deref() == Some("one")));
    }

    #[test]
    fn unsupported_language_falls_back_to_line_window() {
        let chunker = CodeChunker::new(2, 1000);
        let text = "line one\nline two\nline three\nline four\n";
        let chunks = chunker.chunk(text, "cobol", "prog.cbl", "prog.cbl");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_line, Some(1));
    }

    #[test]
    fn chunk_ids_are_stable() {
        let chunker = CodeChunker::default();
        let text = "fn main() {}\n";
        let a = chunker.chunk(text, "rust", "main.rs", "main.rs");
        let b = chunker.chunk(text, "rust", "main.rs", "main.rs");
        assert_eq!(a[0].chunk_id, b[0].chunk_id);
    }

    #[test]
    fn methods_inside_impl_carry_class_name() {
        let chunker = CodeChunker::default();
        let text = "struct Foo;\n\nimpl Foo {\n    fn bar(&self) {}\n}\n";
        let chunks = chunker.chunk(text, "rust", "lib.rs", "lib.rs");
        let method = chunks
            .iter()
            .find(|c| c.symbol_name.as_deref() == Some("bar"));
        if let Some(method) = method {
            assert_eq!(method.class_name.as_deref(), Some("Foo"));
        }
    }
}
