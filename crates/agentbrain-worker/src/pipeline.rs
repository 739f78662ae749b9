//! The indexing pipeline invoked by the job worker for each job: load,
//! chunk, summarize (optional), embed, upsert, rebuild the lexical index,
//! and update the knowledge graph.

use std::path::Path;
use std::sync::Arc;

use agentbrain_chunking::{Chunk, CodeChunker, DocumentLoader, ProseChunker, SourceType, TokenCounter};
use agentbrain_embeddings::{EmbeddingProvider, SummarizationProvider};
use agentbrain_graph::{CodeChunkFacts, GraphStore, GraphTriple};
use agentbrain_storage::{StorageBackend, UpsertDocument};
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// Per-file progress sink, invoked every `progress_checkpoint_interval`
/// files and on the last file. Returning `Err` aborts the pipeline with
/// [`WorkerError::Cancelled`]; the worker uses this to re-read the job
/// record and turn a cancellation request into an abort.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, files_processed: usize, files_total: usize, current_file: &str) -> WorkerResult<()>;
}

pub struct IndexRequest<'a> {
    pub folder_path: &'a Path,
    pub recursive: bool,
    pub include_code: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub supported_languages: Option<Vec<String>>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub generate_summaries: bool,
    pub progress_checkpoint_interval: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOutcome {
    pub documents_processed: usize,
    pub chunks_created: usize,
}

/// Dependencies the pipeline needs, gathered once at startup and shared
/// across every job the worker processes.
pub struct PipelineContext {
    pub loader: Arc<dyn DocumentLoader>,
    pub token_counter: Arc<dyn TokenCounter>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub summarization_provider: Arc<dyn SummarizationProvider>,
    pub backend: Arc<dyn StorageBackend>,
    pub graph_store: Option<Arc<GraphStore>>,
    pub graph_use_code_metadata: bool,
}

/// Resolve `folder_path` to a symlink-free absolute path.
///
/// # Errors
/// Returns [`WorkerError::InvalidFolder`] if the path doesn't exist or
/// can't be canonicalized.
pub fn normalize_folder_path(folder_path: &Path) -> WorkerResult<std::path::PathBuf> {
    folder_path
        .canonicalize()
        .map_err(|e| WorkerError::InvalidFolder(format!("{}: {e}", folder_path.display())))
}

/// Run the full indexing pipeline for one job.
///
/// # Errors
/// Returns [`WorkerError::Cancelled`] if `on_progress` signals a
/// cancellation request, or any other [`WorkerError`] from a failing
/// storage/embedding/chunking call.
pub async fn run(
    ctx: &PipelineContext,
    request: &IndexRequest<'_>,
    on_progress: &dyn ProgressSink,
) -> WorkerResult<IndexOutcome> {
    let folder = normalize_folder_path(request.folder_path)?;

    let documents = ctx
        .loader
        .load(&folder, request.recursive, &request.include_patterns, &request.exclude_patterns)
        .await?;

    let total_documents = documents.len();
    let mut all_chunks: Vec<Chunk> = Vec::new();

    let prose_chunker = ProseChunker::new(ctx.token_counter.as_ref(), request.chunk_size, request.chunk_overlap);
    let code_chunker = CodeChunker::default();

    for (index, document) in documents.iter().enumerate() {
        if let Some(languages) = &request.supported_languages {
            if document.source_type == SourceType::Code
                && !document.language.as_deref().is_some_and(|lang| languages.iter().any(|l| l == lang))
            {
                continue;
            }
        }
        if document.source_type == SourceType::Code && !request.include_code {
            continue;
        }

        let mut chunks = match document.source_type {
            SourceType::Prose => prose_chunker.chunk(&document.text, &document.file_path, &document.file_name),
            SourceType::Code => code_chunker.chunk(
                &document.text,
                document.language.as_deref().unwrap_or(""),
                &document.file_path,
                &document.file_name,
            ),
        };

        if request.generate_summaries && document.source_type == SourceType::Code {
            let language = document.language.clone().unwrap_or_default();
            for chunk in &mut chunks {
                match ctx.summarization_provider.summarize(&chunk.text, &language).await {
                    Ok(summary) => chunk.summary = Some(summary),
                    Err(err) => warn!(file = %document.file_path, error = %err, "summarization failed, continuing without it"),
                }
            }
        }

        all_chunks.extend(chunks);

        let checkpoint = request.progress_checkpoint_interval.max(1);
        if (index + 1) % checkpoint == 0 || index + 1 == total_documents {
            on_progress.on_progress(index + 1, total_documents, &document.file_path).await?;
        }
    }

    if all_chunks.is_empty() {
        return Ok(IndexOutcome {
            documents_processed: total_documents,
            chunks_created: 0,
        });
    }

    let texts: Vec<String> = all_chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = ctx.embedding_provider.embed_texts(&texts, None).await?;

    let upserts: Vec<UpsertDocument> = all_chunks
        .iter()
        .zip(embeddings.into_iter())
        .map(|(chunk, embedding)| UpsertDocument {
            id: chunk.chunk_id.clone(),
            embedding,
            text: chunk.text.clone(),
            metadata: chunk.metadata_map(),
        })
        .collect();

    ctx.backend.upsert(&upserts).await?;
    ctx.backend.rebuild_lexical_index().await?;

    if let Some(graph_store) = &ctx.graph_store {
        for chunk in &all_chunks {
            if chunk.source_type != SourceType::Code {
                continue;
            }
            let triples = extract_graph_triples(chunk, ctx.graph_use_code_metadata);
            for triple in triples {
                graph_store.add_triplet(triple).await;
            }
        }
        graph_store.persist().await?;
    }

    debug!(documents = total_documents, chunks = all_chunks.len(), "indexing pipeline completed");

    Ok(IndexOutcome {
        documents_processed: total_documents,
        chunks_created: all_chunks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use agentbrain_chunking::TiktokenCounter;
    use agentbrain_embeddings::MockEmbeddingProvider;
    use agentbrain_embeddings::MockSummarizationProvider;
    use agentbrain_storage::MockStorage;

    fn context(graph_store: Option<Arc<GraphStore>>) -> PipelineContext {
        PipelineContext {
            loader: Arc::new(agentbrain_chunking::FsDocumentLoader),
            token_counter: Arc::new(TiktokenCounter::new("gpt-4", 8192).expect("tiktoken init")),
            embedding_provider: Arc::new(MockEmbeddingProvider::new(16)),
            summarization_provider: Arc::new(MockSummarizationProvider),
            backend: Arc::new(MockStorage::new()),
            graph_store,
            graph_use_code_metadata: true,
        }
    }

    fn default_request(folder: &Path) -> IndexRequest<'_> {
        IndexRequest {
            folder_path: folder,
            recursive: true,
            include_code: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            supported_languages: None,
            chunk_size: 200,
            chunk_overlap: 0,
            generate_summaries: false,
            progress_checkpoint_interval: 1,
        }
    }

    struct NoopSink;
    #[async_trait::async_trait]
    impl ProgressSink for NoopSink {
        async fn on_progress(&self, _: usize, _: usize, _: &str) -> WorkerResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn indexes_a_small_rust_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn one() {}\n\nfn two() {}\n").unwrap();

        let ctx = context(None);
        let request = default_request(dir.path());
        let outcome = run(&ctx, &request, &NoopSink).await.unwrap();

        assert_eq!(outcome.documents_processed, 1);
        assert!(outcome.chunks_created > 0);
        let count = ctx.backend.get_count(&agentbrain_storage::SearchFilter::default()).await.unwrap();
        assert_eq!(count, outcome.chunks_created);
    }

    #[tokio::test]
    async fn populates_graph_store_from_code_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("worker.rs"), "fn run() {}\n").unwrap();

        let graph_dir = tempfile::tempdir().unwrap();
        let graph_store = Arc::new(GraphStore::open(graph_dir.path()).await.unwrap());
        let ctx = context(Some(Arc::clone(&graph_store)));
        let request = default_request(dir.path());
        run(&ctx, &request, &NoopSink).await.unwrap();

        let triples = graph_store.get_triplets().await;
        assert!(!triples.is_empty());
    }

    #[tokio::test]
    async fn empty_folder_yields_zero_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(None);
        let request = default_request(dir.path());
        let outcome = run(&ctx, &request, &NoopSink).await.unwrap();
        assert_eq!(outcome.chunks_created, 0);
    }
}

fn extract_graph_triples(chunk: &Chunk, use_code_metadata: bool) -> Vec<GraphTriple> {
    if !use_code_metadata {
        return Vec::new();
    }
    let facts = CodeChunkFacts {
        symbol_name: chunk.symbol_name.as_deref(),
        symbol_type: chunk.symbol_type.as_deref(),
        parent_symbol: chunk.parent_symbol.as_deref(),
        class_name: chunk.class_name.as_deref(),
        file_path: &chunk.file_path,
        imports: &chunk.imports,
        language: chunk.language.as_deref(),
        text: &chunk.text,
    };
    let mut triples = agentbrain_graph::extract_from_metadata(&facts, Some(&chunk.chunk_id));
    if chunk.imports.is_empty() {
        triples.extend(agentbrain_graph::extract_from_text(&chunk.text, chunk.language.as_deref(), Some(&chunk.chunk_id)));
    }
    triples
}
