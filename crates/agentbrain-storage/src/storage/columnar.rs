//! Columnar/embedded storage backend: Qdrant for vectors, an in-memory BM25
//! index for lexical search, rebuilt from Qdrant's own payloads.

use crate::bm25::Bm25Index;
use crate::storage::traits::{
    EmbeddingMetadata, SearchFilter, SearchResult, StorageBackend, UpsertDocument,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionExistsRequest, Condition, CountPoints, CreateCollection, DeleteCollection, Distance,
    Filter, GetPoints, PointId, PointStruct, ScrollPoints, SearchPoints, Value, VectorParams,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::sync::Mutex;

const METADATA_POINT_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Qdrant-backed vector store paired with an in-process BM25 lexical index.
pub struct ColumnarBackend {
    client: Qdrant,
    collection_name: String,
    dimensions: usize,
    lexical: RwLock<Bm25Index>,
    metadata_path: PathBuf,
    reindex_lock: Mutex<()>,
}

impl ColumnarBackend {
    /// # Errors
    /// Returns [`StorageError::Backend`] if the Qdrant client cannot be constructed.
    pub fn new(
        url: &str,
        collection_name: &str,
        dimensions: usize,
        bm25_k1: f64,
        bm25_b: f64,
        metadata_path: PathBuf,
    ) -> StorageResult<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            builder = builder.api_key(api_key);
        }
        let client = builder.build().map_err(|e| StorageError::Backend {
            backend: "qdrant".to_string(),
            message: format!("failed to create client: {e}"),
        })?;

        Ok(Self {
            client,
            collection_name: collection_name.to_string(),
            dimensions,
            lexical: RwLock::new(Bm25Index::new(bm25_k1, bm25_b)),
            metadata_path,
            reindex_lock: Mutex::new(()),
        })
    }

    fn err(&self, op: &str, e: impl std::fmt::Display) -> StorageError {
        StorageError::Backend {
            backend: "qdrant".to_string(),
            message: format!("{op}: {e}"),
        }
    }

    async fn collection_exists(&self) -> StorageResult<bool> {
        self.client
            .collection_exists(CollectionExistsRequest {
                collection_name: self.collection_name.clone(),
            })
            .await
            .map_err(|e| self.err("collection_exists", e))
    }

    /// Rebuild the BM25 index from everything currently stored in Qdrant.
    ///
    /// Runs under a mutex so concurrent reindex requests don't race; callers
    /// on the hot query path should not block on this, only the indexing
    /// worker triggers it after a batch of upserts.
    pub async fn reindex_lexical(&self) -> StorageResult<()> {
        let _guard = self.reindex_lock.lock().await;

        let mut documents = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let response = self
                .client
                .scroll(ScrollPoints {
                    collection_name: self.collection_name.clone(),
                    with_payload: Some(true.into()),
                    limit: Some(256),
                    offset: offset.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| self.err("scroll", e))?;

            if response.result.is_empty() {
                break;
            }
            for point in &response.result {
                let id = point_id_string(point.id.as_ref());
                if id == METADATA_POINT_ID {
                    continue;
                }
                let text = point
                    .payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                documents.push((id, text));
            }
            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        let mut index = self.lexical.write().expect("bm25 index lock poisoned");
        index.rebuild(documents.iter().map(|(id, text)| (id.as_str(), text.as_str())));
        Ok(())
    }

    /// Scroll the collection, filtering as much as Qdrant supports
    /// server-side (`source_type`/`language`) and the rest (`file_paths_glob`)
    /// client-side, returning every matching point's id and metadata.
    async fn scroll_matching(
        &self,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<(String, HashMap<String, serde_json::Value>)>> {
        let qdrant_filter = build_qdrant_filter(filter);
        let mut matches = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let response = self
                .client
                .scroll(ScrollPoints {
                    collection_name: self.collection_name.clone(),
                    filter: qdrant_filter.clone(),
                    with_payload: Some(true.into()),
                    limit: Some(256),
                    offset: offset.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| self.err("scroll", e))?;

            if response.result.is_empty() {
                break;
            }
            for point in &response.result {
                let id = point_id_string(point.id.as_ref());
                if id == METADATA_POINT_ID {
                    continue;
                }
                let metadata = payload_to_metadata(&point.payload);
                if passes_filter(&metadata, filter) {
                    matches.push((id, metadata));
                }
            }
            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }
        Ok(matches)
    }
}

/// Build the subset of `filter` Qdrant can evaluate natively as a payload
/// filter: `source_type`/`language` exact-match-any-of. `file_paths_glob`
/// has no Qdrant equivalent and is always applied client-side via
/// [`passes_filter`].
fn build_qdrant_filter(filter: &SearchFilter) -> Option<Filter> {
    let mut must = Vec::new();
    if let Some(source_types) = &filter.source_types {
        if !source_types.is_empty() {
            must.push(Condition::matches("source_type", source_types.clone()));
        }
    }
    if let Some(languages) = &filter.languages {
        if !languages.is_empty() {
            must.push(Condition::matches("language", languages.clone()));
        }
    }
    if must.is_empty() {
        None
    } else {
        Some(Filter::must(must))
    }
}

fn filter_is_empty(filter: &SearchFilter) -> bool {
    filter.source_types.as_ref().is_none_or(Vec::is_empty)
        && filter.languages.as_ref().is_none_or(Vec::is_empty)
        && filter.file_paths_glob.is_none()
}

fn point_id_string(id: Option<&PointId>) -> String {
    id.and_then(|id| id.point_id_options.as_ref())
        .map(|opts| match opts {
            qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) => s.clone(),
            qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default()
}

fn payload_to_metadata(payload: &HashMap<String, Value>) -> HashMap<String, serde_json::Value> {
    payload
        .iter()
        .filter(|(k, _)| k.as_str() != "text")
        .map(|(k, v)| (k.clone(), qdrant_value_to_json(v)))
        .collect()
}

fn qdrant_value_to_json(value: &Value) -> serde_json::Value {
    if let Some(s) = value.as_str() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::Number(i.into())
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else if let Some(d) = value.as_double() {
        serde_json::Number::from_f64(d).map_or(serde_json::Value::Null, serde_json::Value::Number)
    } else {
        serde_json::Value::Null
    }
}

fn metadata_to_payload(metadata: &HashMap<String, serde_json::Value>) -> HashMap<String, Value> {
    metadata
        .iter()
        .filter_map(|(k, v)| json_to_qdrant_value(v).map(|qv| (k.clone(), qv)))
        .collect()
}

fn json_to_qdrant_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::from(s.clone())),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::from)
            .or_else(|| n.as_f64().map(Value::from)),
        serde_json::Value::Bool(b) => Some(Value::from(*b)),
        _ => None,
    }
}

#[async_trait]
impl StorageBackend for ColumnarBackend {
    async fn is_initialized(&self) -> StorageResult<bool> {
        self.collection_exists().await
    }

    async fn initialize(&self) -> StorageResult<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        let request = CreateCollection {
            collection_name: self.collection_name.clone(),
            vectors_config: Some(
                VectorParams {
                    size: self.dimensions as u64,
                    distance: Distance::Cosine as i32,
                    ..Default::default()
                }
                .into(),
            ),
            ..Default::default()
        };
        match self.client.create_collection(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(self.err("create_collection", e)),
        }
    }

    async fn upsert(&self, documents: &[UpsertDocument]) -> StorageResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let mut points = Vec::with_capacity(documents.len());
        for doc in documents {
            let mut payload: HashMap<String, Value> = metadata_to_payload(&doc.metadata);
            payload.insert("text".to_string(), Value::from(doc.text.clone()));
            points.push(PointStruct::new(
                doc.id.clone(),
                doc.embedding.clone(),
                Payload::from(payload),
            ));
        }

        self.client
            .upsert_points(qdrant_client::qdrant::UpsertPoints {
                collection_name: self.collection_name.clone(),
                points,
                ..Default::default()
            })
            .await
            .map_err(|e| self.err("upsert_points", e))?;

        Ok(documents.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        let response = self
            .client
            .search_points(SearchPoints {
                collection_name: self.collection_name.clone(),
                vector: query_embedding.to_vec(),
                limit: top_k as u64,
                with_payload: Some(true.into()),
                score_threshold: Some(similarity_threshold),
                filter: build_qdrant_filter(filter),
                ..Default::default()
            })
            .await
            .map_err(|e| self.err("search_points", e))?;

        let results = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id_string(point.id.as_ref());
                if id == METADATA_POINT_ID {
                    return None;
                }
                let text = point
                    .payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let metadata = payload_to_metadata(&point.payload);
                if !passes_filter(&metadata, filter) {
                    return None;
                }
                Some(SearchResult {
                    chunk_id: id,
                    text,
                    metadata,
                    score: point.score,
                })
            })
            .collect();
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        // Narrow the document id set the BM25 index is allowed to score
        // *before* ranking, rather than over-fetching unfiltered top-k hits
        // and discarding non-matching ones afterward.
        let candidate_ids = if filter_is_empty(filter) {
            None
        } else {
            let matches = self.scroll_matching(filter).await?;
            Some(matches.into_iter().map(|(id, _)| id).collect::<HashSet<_>>())
        };

        let hits = {
            let index = self.lexical.read().expect("bm25 index lock poisoned");
            index.search_within(query, top_k, candidate_ids.as_ref())
        };
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let max_score = hits.iter().map(|(_, s)| *s).fold(0.0_f32, f32::max);
        let point_ids: Vec<PointId> = hits
            .iter()
            .map(|(id, _)| PointId::from(id.clone()))
            .collect();

        let response = self
            .client
            .get_points(GetPoints {
                collection_name: self.collection_name.clone(),
                ids: point_ids,
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| self.err("get_points", e))?;

        let by_id: HashMap<String, &qdrant_client::qdrant::RetrievedPoint> = response
            .result
            .iter()
            .map(|p| (point_id_string(p.id.as_ref()), p))
            .collect();

        let mut results = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let Some(point) = by_id.get(&id) else { continue };
            let text = point
                .payload
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let metadata = payload_to_metadata(&point.payload);
            results.push(SearchResult {
                chunk_id: id,
                text,
                metadata,
                score: score / max_score,
            });
        }
        Ok(results)
    }

    async fn get_count(&self, filter: &SearchFilter) -> StorageResult<usize> {
        if filter_is_empty(filter) {
            let info = self
                .client
                .collection_info(self.collection_name.clone())
                .await
                .map_err(|e| self.err("collection_info", e))?;
            let result = info
                .result
                .ok_or_else(|| StorageError::Other("missing collection info result".to_string()))?;
            return Ok(result.points_count.unwrap_or(0) as usize);
        }

        // `file_paths_glob` has no Qdrant-native equivalent; when it's the
        // only extra constraint (or present alongside the others) fall back
        // to scrolling the server-side-narrowed candidate set and applying
        // the glob client-side, same as vector/keyword search do.
        if filter.file_paths_glob.is_none() {
            let response = self
                .client
                .count(CountPoints {
                    collection_name: self.collection_name.clone(),
                    filter: build_qdrant_filter(filter),
                    exact: Some(true),
                    ..Default::default()
                })
                .await
                .map_err(|e| self.err("count", e))?;
            let result = response
                .result
                .ok_or_else(|| StorageError::Other("missing count result".to_string()))?;
            return Ok(result.count as usize);
        }

        Ok(self.scroll_matching(filter).await?.len())
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let response = self
            .client
            .get_points(GetPoints {
                collection_name: self.collection_name.clone(),
                ids: vec![PointId::from(chunk_id.to_string())],
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| self.err("get_points", e))?;

        Ok(response.result.into_iter().next().map(|point| {
            let text = point
                .payload
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            SearchResult {
                chunk_id: chunk_id.to_string(),
                metadata: payload_to_metadata(&point.payload),
                text,
                score: 1.0,
            }
        }))
    }

    async fn reset(&self) -> StorageResult<()> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(DeleteCollection {
                    collection_name: self.collection_name.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| self.err("delete_collection", e))?;
        }
        self.initialize().await?;
        self.lexical
            .write()
            .expect("bm25 index lock poisoned")
            .rebuild(std::iter::empty());
        if self.metadata_path.exists() {
            std::fs::remove_file(&self.metadata_path)?;
        }
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        if !self.metadata_path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.metadata_path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        if let Some(parent) = self.metadata_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&metadata)?;
        std::fs::write(&self.metadata_path, contents)?;
        Ok(())
    }

    async fn rebuild_lexical_index(&self) -> StorageResult<()> {
        self.reindex_lexical().await
    }
}

fn passes_filter(metadata: &HashMap<String, serde_json::Value>, filter: &SearchFilter) -> bool {
    if let Some(source_types) = &filter.source_types {
        let matches = metadata
            .get("source_type")
            .and_then(|v| v.as_str())
            .is_some_and(|st| source_types.iter().any(|t| t == st));
        if !matches {
            return false;
        }
    }
    if let Some(languages) = &filter.languages {
        let matches = metadata
            .get("language")
            .and_then(|v| v.as_str())
            .is_some_and(|lang| languages.iter().any(|l| l == lang));
        if !matches {
            return false;
        }
    }
    if let Some(pattern) = &filter.file_paths_glob {
        let matches = metadata
            .get("file_path")
            .and_then(|v| v.as_str())
            .is_some_and(|path| {
                glob::Pattern::new(pattern).is_ok_and(|compiled| compiled.matches(path))
            });
        if !matches {
            return false;
        }
    }
    true
}
