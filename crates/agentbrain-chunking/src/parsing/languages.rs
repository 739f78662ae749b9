//! Language-specific configurations for code parsing
//!
//! Centralizes the tree-sitter grammars and query patterns for each
//! supported language.

use lazy_static::lazy_static;
use std::collections::HashMap;
use tree_sitter::Language;

/// Configuration for a specific programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// The language identifier (e.g., "rust", "python")
    pub id: &'static str,
    /// File extensions associated with this language
    pub extensions: &'static [&'static str],
    /// Tree-sitter language parser
    pub tree_sitter_language: Option<Language>,
    /// Tree-sitter query for extracting top-level declarations
    pub tree_sitter_query: Option<&'static str>,
    /// Keywords that indicate function definitions
    pub function_keywords: &'static [&'static str],
    /// Keywords that indicate class/type definitions
    pub class_keywords: &'static [&'static str],
    /// Whether the language uses braces for blocks
    pub uses_braces: bool,
    /// Whether the language uses indentation for blocks (like Python)
    pub uses_indentation: bool,
}

impl LanguageConfig {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            extensions: &[],
            tree_sitter_language: None,
            tree_sitter_query: None,
            function_keywords: &[],
            class_keywords: &[],
            uses_braces: true,
            uses_indentation: false,
        }
    }

    pub const fn with_extensions(mut self, extensions: &'static [&'static str]) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_tree_sitter(mut self, language: Language, query: &'static str) -> Self {
        self.tree_sitter_language = Some(language);
        self.tree_sitter_query = Some(query);
        self
    }

    pub const fn with_function_keywords(mut self, keywords: &'static [&'static str]) -> Self {
        self.function_keywords = keywords;
        self
    }

    pub const fn with_class_keywords(mut self, keywords: &'static [&'static str]) -> Self {
        self.class_keywords = keywords;
        self
    }

    pub const fn with_block_style(mut self, uses_braces: bool, uses_indentation: bool) -> Self {
        self.uses_braces = uses_braces;
        self.uses_indentation = uses_indentation;
        self
    }
}

lazy_static! {
    /// Registry of the languages the code chunker understands natively.
    /// Everything else falls back to the line-window chunker.
    pub static ref LANGUAGE_REGISTRY: HashMap<&'static str, LanguageConfig> = {
        let mut registry = HashMap::new();

        registry.insert(
            "rust",
            LanguageConfig::new("rust")
                .with_extensions(&["rs"])
                .with_tree_sitter(
                    tree_sitter_rust::LANGUAGE.into(),
                    r#"
                    (function_item) @function
                    (impl_item) @impl
                    (struct_item) @struct
                    (enum_item) @enum
                    (trait_item) @trait
                    (mod_item) @module
                    "#,
                )
                .with_function_keywords(&["fn ", "pub fn", "pub(crate) fn", "async fn"])
                .with_class_keywords(&["struct ", "enum ", "trait ", "impl "])
                .with_block_style(true, false),
        );

        registry.insert(
            "python",
            LanguageConfig::new("python")
                .with_extensions(&["py", "pyi"])
                .with_tree_sitter(
                    tree_sitter_python::LANGUAGE.into(),
                    r#"
                    (function_definition) @function
                    (class_definition) @class
                    "#,
                )
                .with_function_keywords(&["def ", "async def "])
                .with_class_keywords(&["class "])
                .with_block_style(false, true),
        );

        registry.insert(
            "javascript",
            LanguageConfig::new("javascript")
                .with_extensions(&["js", "mjs", "cjs"])
                .with_tree_sitter(
                    tree_sitter_javascript::LANGUAGE.into(),
                    r#"
                    (function_declaration) @function
                    (arrow_function) @arrow_function
                    (class_declaration) @class
                    (method_definition) @method
                    "#,
                )
                .with_function_keywords(&["function ", "async function ", "const ", "let ", "var "])
                .with_class_keywords(&["class "])
                .with_block_style(true, false),
        );

        registry.insert(
            "typescript",
            LanguageConfig::new("typescript")
                .with_extensions(&["ts", "mts", "cts"])
                .with_tree_sitter(
                    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                    r#"
                    (function_declaration) @function
                    (arrow_function) @arrow_function
                    (class_declaration) @class
                    (method_definition) @method
                    (interface_declaration) @interface
                    "#,
                )
                .with_function_keywords(&["function ", "async function ", "const ", "let ", "var "])
                .with_class_keywords(&["class ", "interface ", "type ", "enum "])
                .with_block_style(true, false),
        );

        registry.insert(
            "tsx",
            LanguageConfig::new("tsx")
                .with_extensions(&["tsx"])
                .with_tree_sitter(
                    tree_sitter_typescript::LANGUAGE_TSX.into(),
                    r#"
                    (function_declaration) @function
                    (arrow_function) @arrow_function
                    (class_declaration) @class
                    (method_definition) @method
                    "#,
                )
                .with_function_keywords(&["function ", "async function ", "const ", "let ", "var "])
                .with_class_keywords(&["class ", "interface "])
                .with_block_style(true, false),
        );

        registry.insert(
            "go",
            LanguageConfig::new("go")
                .with_extensions(&["go"])
                .with_tree_sitter(
                    tree_sitter_go::LANGUAGE.into(),
                    r#"
                    (function_declaration) @function
                    (method_declaration) @method
                    (type_declaration) @type
                    "#,
                )
                .with_function_keywords(&["func "])
                .with_class_keywords(&["type ", "struct ", "interface "])
                .with_block_style(true, false),
        );

        registry
    };

    /// Map of file extensions to language IDs
    pub static ref EXTENSION_MAP: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        for (lang_id, config) in LANGUAGE_REGISTRY.iter() {
            for ext in config.extensions {
                map.insert(*ext, *lang_id);
            }
        }
        map
    };
}

/// Gets a language configuration by ID
pub fn get_language_config(language_id: &str) -> Option<&'static LanguageConfig> {
    LANGUAGE_REGISTRY.get(language_id)
}

/// Gets a language ID from a file extension
pub fn get_language_from_extension(extension: &str) -> Option<&'static str> {
    EXTENSION_MAP.get(extension).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_registry_initialization() {
        assert!(!LANGUAGE_REGISTRY.is_empty());
        assert!(LANGUAGE_REGISTRY.contains_key("rust"));
        assert!(LANGUAGE_REGISTRY.contains_key("python"));
        assert!(LANGUAGE_REGISTRY.contains_key("javascript"));
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(get_language_from_extension("rs"), Some("rust"));
        assert_eq!(get_language_from_extension("py"), Some("python"));
        assert_eq!(get_language_from_extension("js"), Some("javascript"));
        assert_eq!(get_language_from_extension("ts"), Some("typescript"));
        assert_eq!(get_language_from_extension("go"), Some("go"));
    }

    #[test]
    fn test_language_config_properties() {
        let rust_config = get_language_config("rust").unwrap();
        assert_eq!(rust_config.id, "rust");
        assert!(rust_config.uses_braces);
        assert!(!rust_config.uses_indentation);
        assert!(rust_config.tree_sitter_language.is_some());
        assert!(rust_config.tree_sitter_query.is_some());

        let python_config = get_language_config("python").unwrap();
        assert_eq!(python_config.id, "python");
        assert!(!python_config.uses_braces);
        assert!(python_config.uses_indentation);
    }

    #[test]
    fn test_function_keywords() {
        let rust_config = get_language_config("rust").unwrap();
        assert!(rust_config.function_keywords.contains(&"fn "));
        assert!(rust_config.function_keywords.contains(&"async fn"));

        let python_config = get_language_config("python").unwrap();
        assert!(python_config.function_keywords.contains(&"def "));
        assert!(python_config.function_keywords.contains(&"async def "));
    }

    #[test]
    fn test_class_keywords() {
        let rust_config = get_language_config("rust").unwrap();
        assert!(rust_config.class_keywords.contains(&"struct "));
        assert!(rust_config.class_keywords.contains(&"impl "));
    }

    #[test]
    fn test_tree_sitter_queries() {
        let rust_config = get_language_config("rust").unwrap();
        let query = rust_config.tree_sitter_query.unwrap();
        assert!(query.contains("function_item"));
        assert!(query.contains("impl_item"));
        assert!(query.contains("struct_item"));
    }

    #[test]
    fn test_go_configuration() {
        let go_config = get_language_config("go").unwrap();
        assert_eq!(go_config.id, "go");
        assert!(go_config.extensions.contains(&"go"));
        assert!(go_config.tree_sitter_language.is_some());
        assert!(go_config.function_keywords.contains(&"func "));
        assert!(go_config.class_keywords.contains(&"type "));
        assert!(go_config.uses_braces);
        assert!(!go_config.uses_indentation);
    }

    #[test]
    fn test_typescript_configuration() {
        let ts_config = get_language_config("typescript").unwrap();
        assert_eq!(ts_config.id, "typescript");
        assert!(ts_config.extensions.contains(&"ts"));
        assert!(ts_config.extensions.contains(&"mts"));
        assert!(ts_config.tree_sitter_language.is_some());
        assert!(ts_config.function_keywords.contains(&"function "));
        assert!(ts_config.class_keywords.contains(&"interface "));
        assert!(ts_config.uses_braces);
        assert!(!ts_config.uses_indentation);
    }

    #[test]
    fn test_tsx_configuration() {
        let tsx_config = get_language_config("tsx").unwrap();
        assert_eq!(tsx_config.id, "tsx");
        assert!(tsx_config.extensions.contains(&"tsx"));
        assert!(tsx_config.tree_sitter_language.is_some());
        assert!(tsx_config.uses_braces);
        assert!(!tsx_config.uses_indentation);
    }

    #[test]
    fn test_all_languages_have_config() {
        let expected_languages = ["rust", "python", "javascript", "typescript", "tsx", "go"];

        for lang in expected_languages {
            assert!(
                LANGUAGE_REGISTRY.contains_key(lang),
                "Missing configuration for language: {lang}"
            );

            let config = get_language_config(lang).unwrap();
            assert_eq!(config.id, lang);
            assert!(
                !config.extensions.is_empty(),
                "Language {lang} has no extensions"
            );
            assert!(
                config.tree_sitter_language.is_some(),
                "Language {lang} has no tree-sitter"
            );
            assert!(
                config.tree_sitter_query.is_some(),
                "Language {lang} has no query"
            );
        }
    }

    #[test]
    fn test_block_style_consistency() {
        let python_config = get_language_config("python").unwrap();
        assert!(!python_config.uses_braces);
        assert!(python_config.uses_indentation);

        let rust_config = get_language_config("rust").unwrap();
        assert!(rust_config.uses_braces);
        assert!(!rust_config.uses_indentation);
    }

    #[test]
    fn test_query_completeness() {
        let rust_config = get_language_config("rust").unwrap();
        let rust_query = rust_config.tree_sitter_query.unwrap();
        assert!(rust_query.contains("function_item"));
        assert!(rust_query.contains("impl_item"));
        assert!(rust_query.contains("struct_item"));
        assert!(rust_query.contains("trait_item"));
        assert!(rust_query.contains("mod_item"));

        let python_config = get_language_config("python").unwrap();
        let python_query = python_config.tree_sitter_query.unwrap();
        assert!(python_query.contains("function_definition"));
        assert!(python_query.contains("class_definition"));

        let js_config = get_language_config("javascript").unwrap();
        let js_query = js_config.tree_sitter_query.unwrap();
        assert!(js_query.contains("function_declaration"));
        assert!(js_query.contains("arrow_function"));
        assert!(js_query.contains("class_declaration"));
        assert!(js_query.contains("method_definition"));
    }

    #[test]
    fn test_extension_coverage() {
        let common_extensions = [
            ("rs", "rust"),
            ("py", "python"),
            ("js", "javascript"),
            ("ts", "typescript"),
            ("tsx", "tsx"),
            ("go", "go"),
        ];

        for (ext, expected_lang) in common_extensions {
            let lang = get_language_from_extension(ext);
            assert_eq!(
                lang,
                Some(expected_lang),
                "Extension '{ext}' should map to '{expected_lang}'"
            );
        }
    }
}
