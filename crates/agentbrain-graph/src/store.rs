//! In-memory graph store with JSON file persistence.
//!
//! A single JSON file holds the full triple list; a small sidecar records
//! entity/relationship counts and `last_updated` so status endpoints can
//! report graph size without re-reading the full file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::GraphResult;
use crate::models::{GraphMetadata, GraphTriple};

const GRAPH_FILE: &str = "graph_store.json";
const METADATA_FILE: &str = "graph_metadata.json";

pub struct GraphStore {
    dir: PathBuf,
    triples: Mutex<Vec<GraphTriple>>,
}

impl GraphStore {
    /// Open (and load, if present) the graph store rooted at `dir`.
    ///
    /// # Errors
    /// Returns [`crate::error::GraphError`] if `dir` cannot be created or
    /// an existing graph file is malformed.
    pub async fn open(dir: impl Into<PathBuf>) -> GraphResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let graph_path = dir.join(GRAPH_FILE);
        let triples = if graph_path.exists() {
            let contents = tokio::fs::read_to_string(&graph_path).await?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Self {
            dir,
            triples: Mutex::new(triples),
        })
    }

    /// Add one triple. Always succeeds in the in-memory backend; the
    /// `bool` return mirrors the interface's contract for backends that
    /// can reject a write.
    pub async fn add_triplet(&self, triple: GraphTriple) -> bool {
        self.triples.lock().await.push(triple);
        true
    }

    /// Snapshot of all stored triples.
    pub async fn get_triplets(&self) -> Vec<GraphTriple> {
        self.triples.lock().await.clone()
    }

    /// Number of distinct entities (subjects + objects) currently stored.
    pub async fn entity_count(&self) -> usize {
        let triples = self.triples.lock().await;
        let mut entities = HashSet::new();
        for triple in triples.iter() {
            entities.insert(triple.subject.as_str());
            entities.insert(triple.object.as_str());
        }
        entities.len()
    }

    /// Write the full triple list and metadata sidecar to disk.
    ///
    /// # Errors
    /// Returns [`crate::error::GraphError`] if either file cannot be written.
    pub async fn persist(&self) -> GraphResult<()> {
        let triples = self.triples.lock().await;
        let graph_path = self.dir.join(GRAPH_FILE);
        let json = serde_json::to_string_pretty(&*triples)?;
        tokio::fs::write(&graph_path, json).await?;

        let metadata = GraphMetadata {
            entity_count: {
                let mut entities = HashSet::new();
                for triple in triples.iter() {
                    entities.insert(triple.subject.as_str());
                    entities.insert(triple.object.as_str());
                }
                entities.len()
            },
            relationship_count: triples.len(),
            last_updated: Some(chrono::Utc::now()),
        };
        let metadata_path = self.dir.join(METADATA_FILE);
        tokio::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?).await?;

        debug!(
            relationships = metadata.relationship_count,
            entities = metadata.entity_count,
            "persisted graph store"
        );
        Ok(())
    }

    /// Discard all in-memory triples and remove the persisted file.
    ///
    /// # Errors
    /// Returns [`crate::error::GraphError`] if the persisted file exists
    /// but cannot be removed.
    pub async fn clear(&self) -> GraphResult<()> {
        self.triples.lock().await.clear();
        let graph_path = self.dir.join(GRAPH_FILE);
        if graph_path.exists() {
            tokio::fs::remove_file(&graph_path).await?;
        }
        Ok(())
    }

    /// Read the metadata sidecar, if present.
    ///
    /// # Errors
    /// Returns [`crate::error::GraphError`] if the file exists but is malformed.
    pub async fn read_metadata(dir: &Path) -> GraphResult<Option<GraphMetadata>> {
        let path = dir.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(subject: &str, object: &str) -> GraphTriple {
        GraphTriple {
            subject: subject.to_string(),
            subject_type: None,
            predicate: "imports".to_string(),
            object: object.to_string(),
            object_type: None,
            source_chunk_id: None,
        }
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path()).await.unwrap();
        store.add_triplet(triple("a", "b")).await;
        let triples = store.get_triplets().await;
        assert_eq!(triples.len(), 1);
    }

    #[tokio::test]
    async fn persist_then_reopen_reloads_triples() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path()).await.unwrap();
        store.add_triplet(triple("a", "b")).await;
        store.persist().await.unwrap();

        let reopened = GraphStore::open(dir.path()).await.unwrap();
        let triples = reopened.get_triplets().await;
        assert_eq!(triples.len(), 1);

        let metadata = GraphStore::read_metadata(dir.path()).await.unwrap().unwrap();
        assert_eq!(metadata.relationship_count, 1);
    }

    #[tokio::test]
    async fn clear_removes_persisted_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path()).await.unwrap();
        store.add_triplet(triple("a", "b")).await;
        store.persist().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_triplets().await.is_empty());
        assert!(!dir.path().join(GRAPH_FILE).exists());
    }
}
