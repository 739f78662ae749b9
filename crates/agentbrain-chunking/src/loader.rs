//! Filesystem document loader.
//!
//! Walks a folder, applies include/exclude glob filtering, transcodes
//! non-UTF-8 text, and classifies each file's `source_type`/`language`
//! from its extension. Binary files and oversized files are skipped with
//! a debug log line, never an error.

use std::path::Path;

use ignore::WalkBuilder;
use tracing::debug;

use crate::models::{LoadedDocument, SourceType};
use crate::parsing::get_language_from_extension;

/// Files over this size are skipped outright; they are almost never
/// meaningful chunk sources and reading them fully would be wasteful.
const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

const PROSE_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

#[async_trait::async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(
        &self,
        folder: &Path,
        recursive: bool,
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> std::io::Result<Vec<LoadedDocument>>;
}

/// Default filesystem-backed loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentLoader;

#[async_trait::async_trait]
impl DocumentLoader for FsDocumentLoader {
    async fn load(
        &self,
        folder: &Path,
        recursive: bool,
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> std::io::Result<Vec<LoadedDocument>> {
        let folder = folder.to_path_buf();
        let include_patterns = include_patterns.to_vec();
        let exclude_patterns = exclude_patterns.to_vec();

        tokio::task::spawn_blocking(move || {
            load_blocking(&folder, recursive, &include_patterns, &exclude_patterns)
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
    }
}

fn load_blocking(
    folder: &Path,
    recursive: bool,
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> std::io::Result<Vec<LoadedDocument>> {
    let includes: Vec<glob::Pattern> = include_patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();
    let excludes: Vec<glob::Pattern> = exclude_patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut walker = WalkBuilder::new(folder);
    walker.max_depth(if recursive { None } else { Some(1) });

    let mut documents = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(folder).unwrap_or(path);
        let relative_str = relative.to_string_lossy();

        if !includes.is_empty() && !includes.iter().any(|p| p.matches(&relative_str)) {
            continue;
        }
        if excludes.iter().any(|p| p.matches(&relative_str)) {
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        if metadata.len() > MAX_FILE_SIZE_BYTES {
            debug!(path = %path.display(), size = metadata.len(), "skipping oversized file");
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        let Some(text) = decode_text(&bytes) else {
            debug!(path = %path.display(), "skipping binary file");
            continue;
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        let language = get_language_from_extension(&extension).map(str::to_string);
        let source_type = if PROSE_EXTENSIONS.contains(&extension.as_str()) {
            SourceType::Prose
        } else {
            SourceType::Code
        };

        documents.push(LoadedDocument {
            text,
            source_type,
            language,
            file_path: path.to_string_lossy().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_size: metadata.len(),
        });
    }

    Ok(documents)
}

/// Returns `None` for content that can't be represented as UTF-8 text
/// (binary files, or text in an encoding this loader doesn't recognize).
fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_text_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.py"), "print(1)").unwrap();

        let loader = FsDocumentLoader;
        let docs = loader.load(dir.path(), true, &[], &[]).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.py"), "print(1)").unwrap();

        let loader = FsDocumentLoader;
        let docs = loader.load(dir.path(), false, &[], &[]).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn skips_binary_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0u8, 1, 2, 255]).unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();

        let loader = FsDocumentLoader;
        let docs = loader.load(dir.path(), true, &[], &[]).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "a.rs");
    }

    #[tokio::test]
    async fn exclude_pattern_filters_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("a_test.rs"), "fn test() {}").unwrap();

        let loader = FsDocumentLoader;
        let docs = loader
            .load(dir.path(), true, &[], &["*_test.rs".to_string()])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "a.rs");
    }
}
