//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for a file or directory: extraction →
//! chunking → concurrent embedding → batched idempotent writes.
//!
//! Embedding fans out to a bounded pool of tasks; their completions
//! arrive over a channel in arbitrary order. The coordinator is the
//! channel's only consumer and the only writer to the record buffer,
//! so buffer append, size check, and flush never race.
//!
//! Failure isolation: an unreadable document or a failed chunk
//! embedding is logged and skipped, never fatal to the run. A failed
//! bulk write is retried once (ids are content-addressed, so the retry
//! cannot duplicate anything), then dropped with an error log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::chunk::{content_id, split_chunks};
use crate::config::Config;
use crate::embedding::{embed_one, Embedder};
use crate::extract::{extract_text, DocumentKind};
use crate::models::ChunkRecord;
use crate::store::VectorStore;

/// Knobs for one ingestion run, lifted out of [`Config`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_chars: usize,
    pub batch_size: usize,
    pub max_workers: usize,
}

impl From<&Config> for IngestOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_chars: config.chunking.max_chars,
            batch_size: config.ingest.batch_size,
            max_workers: config.ingest.max_workers,
        }
    }
}

/// Counters for one ingestion run, printed by the CLI.
#[derive(Debug, Default, Clone)]
pub struct IngestReport {
    /// Documents whose text made it into the chunker.
    pub documents: u64,
    /// Documents skipped (unreadable or extraction failed).
    pub skipped_documents: u64,
    /// Chunks produced across all documents.
    pub chunks: u64,
    /// Chunks successfully embedded.
    pub embedded: u64,
    /// Chunks whose embedding failed (logged and skipped).
    pub failed_chunks: u64,
    /// Newly inserted records (duplicates are no-ops and not counted).
    pub inserted: u64,
}

/// Ingest a file or directory tree into the store.
pub async fn run_ingest(
    store: &dyn VectorStore,
    embedder: Arc<dyn Embedder>,
    path: &Path,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let files = collect_files(path)?;
    let mut report = IngestReport::default();

    // Extraction and chunking are cheap relative to embedding; run them
    // up front so the fan-out below sees one flat list of chunks.
    let mut tagged_chunks: Vec<(String, String)> = Vec::new();

    for file in &files {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        let bytes = match std::fs::read(file) {
            Ok(b) => b,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "unreadable file, skipping");
                report.skipped_documents += 1;
                continue;
            }
        };

        let kind = DocumentKind::from_path(file);
        if kind == DocumentKind::Unsupported {
            debug!(file = %file.display(), "no recognized extension, treating as plain text");
        }

        let text = match extract_text(&bytes, &filename, kind) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "extraction failed, skipping document");
                report.skipped_documents += 1;
                continue;
            }
        };

        let chunks = split_chunks(&text, options.max_chars);
        report.documents += 1;
        report.chunks += chunks.len() as u64;

        for chunk in chunks {
            // Provenance tag. Hashed and stored as one string so the
            // content id always matches what is persisted.
            tagged_chunks.push((format!("[{}] {}", filename, chunk), filename.clone()));
        }
    }

    // Fan out embedding, bounded by max_workers in-flight tasks. Each
    // task reports through the channel; this task is the only consumer.
    let semaphore = Arc::new(Semaphore::new(options.max_workers));
    let (tx, mut rx) = mpsc::channel::<Result<ChunkRecord>>(options.batch_size.max(1));

    for (content, source) in tagged_chunks {
        let semaphore = Arc::clone(&semaphore);
        let embedder = Arc::clone(&embedder);
        let tx = tx.clone();
        tokio::spawn(async move {
            // Holder dropped only when the owning task finishes; an
            // acquire error means the semaphore closed, which we never do.
            let _permit = semaphore.acquire_owned().await;
            let result = embed_one(embedder.as_ref(), &content)
                .await
                .map(|embedding| ChunkRecord {
                    id: content_id(&content),
                    content,
                    embedding,
                    source: Some(source),
                })
                .map_err(|e| e.context("embedding failed for chunk"));
            // Receiver dropping early means the run was abandoned.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut buffer: Vec<ChunkRecord> = Vec::with_capacity(options.batch_size);

    while let Some(result) = rx.recv().await {
        match result {
            Ok(record) => {
                report.embedded += 1;
                buffer.push(record);
                if buffer.len() >= options.batch_size {
                    report.inserted += flush(store, &mut buffer).await;
                }
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "chunk skipped");
                report.failed_chunks += 1;
            }
        }
    }

    report.inserted += flush(store, &mut buffer).await;

    Ok(report)
}

/// Write out the buffer as one idempotent batch. Retries the whole
/// batch once on failure, then drops it with an error log.
async fn flush(store: &dyn VectorStore, buffer: &mut Vec<ChunkRecord>) -> u64 {
    if buffer.is_empty() {
        return 0;
    }
    let batch = std::mem::take(buffer);

    match store.insert_batch(&batch).await {
        Ok(n) => n,
        Err(first) => {
            warn!(error = %format!("{:#}", first), "bulk write failed, retrying once");
            match store.insert_batch(&batch).await {
                Ok(n) => n,
                Err(second) => {
                    error!(
                        records = batch.len(),
                        error = %format!("{:#}", second),
                        "bulk write failed after retry, dropping batch"
                    );
                    0
                }
            }
        }
    }
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("ingest path does not exist: {}", path.display());
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    // Deterministic processing order for stable logs and reports.
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StubEmbedder;
    use crate::migrate::run_migrations;
    use crate::store::SqliteStore;
    use anyhow::bail;
    use async_trait::async_trait;
    use sqlx::SqlitePool;

    const DIMS: usize = 8;

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStore::new(pool, DIMS)
    }

    fn options() -> IngestOptions {
        IngestOptions {
            max_chars: 1000,
            batch_size: 4,
            max_workers: 2,
        }
    }

    /// Embedder that fails for any text containing a marker.
    struct PoisonEmbedder {
        inner: StubEmbedder,
    }

    #[async_trait]
    impl Embedder for PoisonEmbedder {
        fn model_name(&self) -> &str {
            "poison"
        }
        fn dims(&self) -> usize {
            DIMS
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("poison")) {
                bail!("simulated embedding failure");
            }
            self.inner.embed(texts).await
        }
    }

    /// Embedder whose task dies outright for a marked text, sending
    /// nothing back on the channel.
    struct PanickingEmbedder {
        inner: StubEmbedder,
    }

    #[async_trait]
    impl Embedder for PanickingEmbedder {
        fn model_name(&self) -> &str {
            "panicking"
        }
        fn dims(&self) -> usize {
            DIMS
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("poison")) {
                panic!("simulated task death");
            }
            self.inner.embed(texts).await
        }
    }

    /// Store whose writes always fail, for the retry-then-drop policy.
    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn insert_batch(&self, _records: &[ChunkRecord]) -> anyhow::Result<u64> {
            bail!("store unreachable");
        }
        async fn nearest(&self, _query: &[f32], _k: usize) -> anyhow::Result<Vec<String>> {
            bail!("store unreachable");
        }
    }

    #[tokio::test]
    async fn ingests_text_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "first paragraph\nsecond paragraph").unwrap();
        std::fs::write(dir.path().join("b.txt"), "another document").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(StubEmbedder::new(DIMS));
        let report = run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.skipped_documents, 0);
        assert_eq!(report.failed_chunks, 0);
        assert_eq!(report.embedded, report.chunks);
        assert_eq!(report.inserted, report.chunks);
    }

    #[tokio::test]
    async fn reingestion_inserts_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("doc.txt"),
            "alpha paragraph\nbeta paragraph\ngamma paragraph",
        )
        .unwrap();

        let store = memory_store().await;
        let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder::new(DIMS));

        let first = run_ingest(&store, Arc::clone(&embedder), dir.path(), &options())
            .await
            .unwrap();
        assert!(first.inserted > 0);

        let second = run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();
        assert_eq!(second.inserted, 0, "duplicate ids must be no-ops");
    }

    #[tokio::test]
    async fn corrupt_document_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), b"not a valid pdf").unwrap();
        std::fs::write(dir.path().join("good.txt"), "useful text").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(StubEmbedder::new(DIMS));
        let report = run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.skipped_documents, 1);
        assert_eq!(report.documents, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn failed_chunk_embedding_does_not_lose_the_batch() {
        // Ten one-paragraph documents, one of them poisoned: exactly
        // nine records must land.
        let dir = tempfile::tempdir().unwrap();
        for i in 0..9 {
            std::fs::write(
                dir.path().join(format!("doc{}.txt", i)),
                format!("wholesome content number {}", i),
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("doc9.txt"), "poison content").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(PoisonEmbedder {
            inner: StubEmbedder::new(DIMS),
        });
        let report = run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.chunks, 10);
        assert_eq!(report.failed_chunks, 1);
        assert_eq!(report.embedded, 9);
        assert_eq!(report.inserted, 9);

        let all = store.nearest(&vec![0.0; DIMS], 100).await.unwrap();
        assert_eq!(all.len(), 9);
    }

    #[tokio::test]
    async fn panicked_embedding_task_is_not_counted_as_embedded() {
        // The dead task reports neither Ok nor Err; `embedded` must
        // reflect only the completions that actually arrived.
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            std::fs::write(
                dir.path().join(format!("doc{}.txt", i)),
                format!("plain content number {}", i),
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("doc4.txt"), "poison content").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(PanickingEmbedder {
            inner: StubEmbedder::new(DIMS),
        });
        let report = run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.chunks, 5);
        assert_eq!(report.embedded, 4);
        assert_eq!(report.failed_chunks, 0);
        assert_eq!(report.inserted, 4);
    }

    #[tokio::test]
    async fn unwritable_store_drops_batches_but_run_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.txt"), "some text").unwrap();

        let embedder = Arc::new(StubEmbedder::new(DIMS));
        let report = run_ingest(&BrokenStore, embedder, dir.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.embedded, 1);
        assert_eq!(report.inserted, 0);
    }

    #[tokio::test]
    async fn single_file_path_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.txt");
        std::fs::write(&file, "lone document").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(StubEmbedder::new(DIMS));
        let report = run_ingest(&store, embedder, &file, &options())
            .await
            .unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let store = memory_store().await;
        let embedder = Arc::new(StubEmbedder::new(DIMS));
        let result = run_ingest(
            &store,
            embedder,
            Path::new("/nonexistent/ragmill"),
            &options(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn chunk_content_carries_source_tag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tagged.txt"), "tagged body").unwrap();

        let store = memory_store().await;
        let embedder = Arc::new(StubEmbedder::new(DIMS));
        run_ingest(&store, embedder, dir.path(), &options())
            .await
            .unwrap();

        let contents = store.nearest(&vec![0.0; DIMS], 1).await.unwrap();
        assert_eq!(contents, vec!["[tagged.txt] tagged body".to_string()]);
    }
}
