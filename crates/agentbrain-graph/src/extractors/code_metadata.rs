//! Deterministic, pattern-based triple extraction from code chunk metadata.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{GraphTriple, PREDICATE_CONTAINS, PREDICATE_DEFINED_IN, PREDICATE_IMPORTS};

/// Chunk-shaped fields the code metadata extractor reads. Kept narrow and
/// decoupled from `agentbrain_chunking::Chunk` so this crate doesn't need
/// a hard dependency on the chunking crate for a handful of fields.
#[derive(Debug, Clone, Default)]
pub struct CodeChunkFacts<'a> {
    pub symbol_name: Option<&'a str>,
    pub symbol_type: Option<&'a str>,
    pub parent_symbol: Option<&'a str>,
    pub class_name: Option<&'a str>,
    pub file_path: &'a str,
    pub imports: &'a [String],
    pub language: Option<&'a str>,
    pub text: &'a str,
}

/// Derive a module name from a file's basename: strip the extension,
/// replace anything that isn't `[A-Za-z0-9_]` with `_`.
#[must_use]
pub fn module_name_from_path(file_path: &str) -> Option<String> {
    let basename = file_path
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .unwrap_or(file_path)
        .to_string();
    let stem = basename.rsplit_once('.').map_or(basename.as_str(), |(stem, _)| stem);
    if stem.is_empty() {
        return None;
    }
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Extract the five structural relationship kinds described in the
/// graph module's specification from one code chunk's AST metadata.
#[must_use]
pub fn extract_from_metadata(facts: &CodeChunkFacts<'_>, source_chunk_id: Option<&str>) -> Vec<GraphTriple> {
    let mut triplets = Vec::new();
    let module_name = module_name_from_path(facts.file_path);

    for import in facts.imports {
        triplets.push(GraphTriple {
            subject: facts
                .symbol_name
                .map(str::to_string)
                .or_else(|| module_name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            subject_type: facts.symbol_type.map(str::to_string).or_else(|| Some("Module".to_string())),
            predicate: PREDICATE_IMPORTS.to_string(),
            object: import.clone(),
            object_type: Some("Module".to_string()),
            source_chunk_id: source_chunk_id.map(str::to_string),
        });
    }

    if let (Some(symbol), Some(parent)) = (facts.symbol_name, facts.parent_symbol) {
        triplets.push(GraphTriple {
            subject: parent.to_string(),
            subject_type: Some(if parent.contains('.') { "Module" } else { "Class" }.to_string()),
            predicate: PREDICATE_CONTAINS.to_string(),
            object: symbol.to_string(),
            object_type: facts.symbol_type.map(str::to_string).or_else(|| Some("Symbol".to_string())),
            source_chunk_id: source_chunk_id.map(str::to_string),
        });
    }

    if let (Some(symbol), Some(class_name)) = (facts.symbol_name, facts.class_name) {
        let is_method = matches!(facts.symbol_type, Some("method" | "function"));
        if is_method && class_name != symbol {
            triplets.push(GraphTriple {
                subject: class_name.to_string(),
                subject_type: Some("Class".to_string()),
                predicate: PREDICATE_CONTAINS.to_string(),
                object: symbol.to_string(),
                object_type: facts.symbol_type.map(|t| capitalize(t)),
                source_chunk_id: source_chunk_id.map(str::to_string),
            });
        }
    }

    if let (Some(module), Some(symbol)) = (&module_name, facts.symbol_name) {
        if facts.parent_symbol.is_none() && facts.class_name.is_none() {
            triplets.push(GraphTriple {
                subject: module.clone(),
                subject_type: Some("Module".to_string()),
                predicate: PREDICATE_CONTAINS.to_string(),
                object: symbol.to_string(),
                object_type: facts.symbol_type.map(str::to_string).or_else(|| Some("Symbol".to_string())),
                source_chunk_id: source_chunk_id.map(str::to_string),
            });
        }
    }

    if let (Some(symbol), Some(module)) = (facts.symbol_name, &module_name) {
        triplets.push(GraphTriple {
            subject: symbol.to_string(),
            subject_type: facts.symbol_type.map(str::to_string).or_else(|| Some("Symbol".to_string())),
            predicate: PREDICATE_DEFINED_IN.to_string(),
            object: module.clone(),
            object_type: Some("Module".to_string()),
            source_chunk_id: source_chunk_id.map(str::to_string),
        });
    }

    triplets
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^import\s+([\w.]+)").unwrap());
static PY_FROM_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^from\s+([\w.]+)\s+import").unwrap());
static JS_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static JS_REQUIRE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static GO_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"import\s+"([^"]+)""#).unwrap());
static GO_IMPORT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)import\s*\((.*?)\)").unwrap());
static GO_IMPORT_BLOCK_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// Fallback import extraction used when AST metadata didn't already
/// populate `imports` (e.g. the line-window chunker's output).
#[must_use]
pub fn extract_from_text(text: &str, language: Option<&str>, source_chunk_id: Option<&str>) -> Vec<GraphTriple> {
    let Some(language) = language else {
        return Vec::new();
    };

    let modules: Vec<(String, &str)> = match language.to_lowercase().as_str() {
        "python" => PY_IMPORT
            .captures_iter(text)
            .chain(PY_FROM_IMPORT.captures_iter(text))
            .filter_map(|c| c.get(1).map(|m| (m.as_str().to_string(), "Module")))
            .collect(),
        "javascript" | "typescript" | "tsx" | "jsx" => JS_IMPORT
            .captures_iter(text)
            .chain(JS_REQUIRE.captures_iter(text))
            .filter_map(|c| c.get(1).map(|m| (m.as_str().to_string(), "Module")))
            .collect(),
        "go" => {
            let mut modules: Vec<(String, &str)> = GO_IMPORT
                .captures_iter(text)
                .filter_map(|c| c.get(1).map(|m| (m.as_str().to_string(), "Package")))
                .collect();
            if let Some(block) = GO_IMPORT_BLOCK.captures(text).and_then(|c| c.get(1)) {
                modules.extend(
                    GO_IMPORT_BLOCK_ENTRY
                        .captures_iter(block.as_str())
                        .filter_map(|c| c.get(1).map(|m| (m.as_str().to_string(), "Package"))),
                );
            }
            modules
        }
        _ => Vec::new(),
    };

    modules
        .into_iter()
        .map(|(module, object_type)| GraphTriple {
            subject: "current_module".to_string(),
            subject_type: Some("Module".to_string()),
            predicate: PREDICATE_IMPORTS.to_string(),
            object: module,
            object_type: Some(object_type.to_string()),
            source_chunk_id: source_chunk_id.map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_strips_extension_and_punctuation() {
        assert_eq!(module_name_from_path("src/my-mod.rs"), Some("my_mod".to_string()));
    }

    #[test]
    fn top_level_symbol_contains_relationship() {
        let facts = CodeChunkFacts {
            symbol_name: Some("run"),
            symbol_type: Some("function"),
            file_path: "worker.rs",
            imports: &[],
            ..Default::default()
        };
        let triples = extract_from_metadata(&facts, Some("chunk_1"));
        assert!(triples.iter().any(|t| t.predicate == PREDICATE_CONTAINS && t.subject == "worker"));
        assert!(triples.iter().any(|t| t.predicate == PREDICATE_DEFINED_IN));
    }

    #[test]
    fn method_inside_class_emits_contains() {
        let facts = CodeChunkFacts {
            symbol_name: Some("process"),
            symbol_type: Some("method"),
            class_name: Some("Worker"),
            file_path: "worker.rs",
            imports: &[],
            ..Default::default()
        };
        let triples = extract_from_metadata(&facts, None);
        assert!(triples
            .iter()
            .any(|t| t.subject == "Worker" && t.object == "process" && t.predicate == PREDICATE_CONTAINS));
    }

    #[test]
    fn python_import_fallback_extracts_module() {
        let triples = extract_from_text("import os\nfrom sys import path", Some("python"), None);
        assert!(triples.iter().any(|t| t.object == "os"));
        assert!(triples.iter().any(|t| t.object == "sys"));
    }
}
