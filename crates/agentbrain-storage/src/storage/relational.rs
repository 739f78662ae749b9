//! Relational storage backend: one `documents` table in Postgres holding a
//! pgvector embedding column, a generated `tsvector` for full-text search,
//! and a JSONB metadata column.

use crate::storage::traits::{
    EmbeddingMetadata, SearchFilter, SearchResult, StorageBackend, UpsertDocument,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};

/// Postgres/pgvector-backed storage.
pub struct RelationalBackend {
    pool: PgPool,
    dimensions: usize,
}

impl RelationalBackend {
    /// # Errors
    /// Returns [`StorageError::Backend`] if the connection pool cannot be created.
    pub async fn connect(database_url: &str, dimensions: usize) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend {
                backend: "postgres".to_string(),
                message: format!("failed to connect: {e}"),
            })?;
        Ok(Self { pool, dimensions })
    }
}

#[async_trait]
impl StorageBackend for RelationalBackend {
    async fn is_initialized(&self) -> StorageResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 'documents') AS exists",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<bool, _>("exists"))
    }

    async fn initialize(&self) -> StorageResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS documents (
                chunk_id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding vector({dim}) NOT NULL,
                tsv tsvector GENERATED ALWAYS AS (to_tsvector('english', text)) STORED,
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb
            )",
            dim = self.dimensions
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS documents_tsv_idx ON documents USING GIN (tsv)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_embedding_idx ON documents
                USING hnsw (embedding vector_cosine_ops)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embedding_metadata (
                id BOOLEAN PRIMARY KEY DEFAULT true CHECK (id),
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                dimensions BIGINT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, documents: &[UpsertDocument]) -> StorageResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for doc in documents {
            let metadata = serde_json::to_value(&doc.metadata)?;
            let embedding = Vector::from(doc.embedding.clone());
            sqlx::query(
                "INSERT INTO documents (chunk_id, text, embedding, metadata)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (chunk_id) DO UPDATE
                 SET text = EXCLUDED.text, embedding = EXCLUDED.embedding, metadata = EXCLUDED.metadata",
            )
            .bind(&doc.id)
            .bind(&doc.text)
            .bind(embedding)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(documents.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        let embedding = Vector::from(query_embedding.to_vec());
        let (where_clause, binds) = build_filter_clause(filter);
        let sql = format!(
            "SELECT chunk_id, text, metadata, 1 - (embedding <=> $1) AS score
             FROM documents
             {where_clause}
             ORDER BY embedding <=> $1
             LIMIT {top_k}"
        );
        let mut query = sqlx::query(&sql).bind(embedding);
        for bind in &binds {
            query = match bind {
                FilterBind::StringArray(values) => query.bind(values.clone()),
                FilterBind::Like(pattern) => query.bind(pattern.clone()),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let score: f64 = row.get("score");
            if (score as f32) < similarity_threshold {
                continue;
            }
            results.push(row_to_result(&row, score as f32)?);
        }
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> StorageResult<Vec<SearchResult>> {
        let (where_clause, binds) = build_filter_clause(filter);
        let where_clause = if where_clause.is_empty() {
            "WHERE tsv @@ plainto_tsquery('english', $1)".to_string()
        } else {
            format!("{where_clause} AND tsv @@ plainto_tsquery('english', $1)")
        };
        let sql = format!(
            "SELECT chunk_id, text, metadata, ts_rank(tsv, plainto_tsquery('english', $1)) AS score
             FROM documents
             {where_clause}
             ORDER BY score DESC
             LIMIT {top_k}"
        );
        let mut query = sqlx::query(&sql).bind(query);
        for bind in &binds {
            query = match bind {
                FilterBind::StringArray(values) => query.bind(values.clone()),
                FilterBind::Like(pattern) => query.bind(pattern.clone()),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;

        let max_score = rows.iter().map(|r| r.get::<f64, _>("score")).fold(0.0_f64, f64::max);

        rows.iter()
            .map(|row| {
                let raw: f64 = row.get("score");
                let normalized = if max_score > 0.0 { raw / max_score } else { 0.0 };
                row_to_result(row, normalized as f32)
            })
            .collect()
    }

    async fn get_count(&self, filter: &SearchFilter) -> StorageResult<usize> {
        let (where_clause, binds) = build_filter_clause(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM documents {where_clause}");
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = match bind {
                FilterBind::StringArray(values) => query.bind(values.clone()),
                FilterBind::Like(pattern) => query.bind(pattern.clone()),
            };
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("count") as usize)
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let row = sqlx::query("SELECT chunk_id, text, metadata FROM documents WHERE chunk_id = $1")
            .bind(chunk_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row_to_result(&row, 1.0)).transpose()
    }

    async fn reset(&self) -> StorageResult<()> {
        sqlx::query("TRUNCATE TABLE documents").execute(&self.pool).await?;
        sqlx::query("DELETE FROM embedding_metadata")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        let row = sqlx::query("SELECT provider, model, dimensions FROM embedding_metadata LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| EmbeddingMetadata {
            provider: row.get("provider"),
            model: row.get("model"),
            dimensions: row.get::<i64, _>("dimensions") as usize,
        }))
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO embedding_metadata (id, provider, model, dimensions)
             VALUES (true, $1, $2, $3)
             ON CONFLICT (id) DO UPDATE
             SET provider = EXCLUDED.provider, model = EXCLUDED.model, dimensions = EXCLUDED.dimensions",
        )
        .bind(&metadata.provider)
        .bind(&metadata.model)
        .bind(metadata.dimensions as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_result(row: &sqlx::postgres::PgRow, score: f32) -> StorageResult<SearchResult> {
    let metadata_json: serde_json::Value = row.get("metadata");
    let metadata = match metadata_json {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => std::collections::HashMap::new(),
    };
    Ok(SearchResult {
        chunk_id: row.get("chunk_id"),
        text: row.get("text"),
        metadata,
        score,
    })
}

/// A bind value for one of the dynamic filter clauses.
enum FilterBind {
    StringArray(Vec<String>),
    Like(String),
}

/// Builds a `WHERE ...` clause (possibly empty) plus the bind values for
/// `source_type`/`language`/`file_paths_glob`, starting bind numbering at
/// `$2` since `$1` is always the query vector/text.
fn build_filter_clause(filter: &SearchFilter) -> (String, Vec<FilterBind>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();
    let mut next_bind = 2;

    if let Some(source_types) = &filter.source_types
        && !source_types.is_empty()
    {
        clauses.push(format!("metadata->>'source_type' = ANY(${next_bind})"));
        binds.push(FilterBind::StringArray(source_types.clone()));
        next_bind += 1;
    }
    if let Some(languages) = &filter.languages
        && !languages.is_empty()
    {
        clauses.push(format!("metadata->>'language' = ANY(${next_bind})"));
        binds.push(FilterBind::StringArray(languages.clone()));
        next_bind += 1;
    }
    if let Some(glob) = &filter.file_paths_glob {
        let like = glob.replace('*', "%").replace('?', "_");
        clauses.push(format!("metadata->>'file_path' LIKE ${next_bind}"));
        binds.push(FilterBind::Like(like));
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), binds)
    }
}
