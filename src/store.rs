//! Vector store abstraction and the SQLite backend.
//!
//! The [`VectorStore`] trait is the pipeline's whole view of storage:
//! an idempotent bulk write and a k-nearest-neighbor query. How the
//! backend indexes vectors is its own business; [`SqliteStore`] keeps
//! them as little-endian f32 BLOBs and ranks candidates by L2 distance
//! in Rust.
//!
//! Both operations reject vectors whose length differs from the store's
//! configured dimension before touching any data — mixing embedding
//! models corrupts distance semantics silently, so it must fail loudly
//! here instead.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, l2_distance, vec_to_blob};
use crate::models::ChunkRecord;

/// Storage backend for embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk insert-if-absent by id. Re-inserting an existing id is a
    /// no-op (first write wins). Returns the number of newly inserted
    /// records.
    async fn insert_batch(&self, records: &[ChunkRecord]) -> Result<u64>;

    /// Contents of the `k` records nearest (ascending L2 distance) to
    /// `query`.
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<String>>;
}

/// SQLite-backed store. `dims` is fixed at construction; every write
/// and query is checked against it.
pub struct SqliteStore {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn insert_batch(&self, records: &[ChunkRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        for record in records {
            if record.embedding.len() != self.dims {
                bail!(
                    "record {} has a {}-dimensional embedding, store is configured for {}",
                    record.id,
                    record.embedding.len(),
                    self.dims
                );
            }
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let blob = vec_to_blob(&record.embedding);
            let result = sqlx::query(
                r#"
                INSERT INTO documents (id, content, embedding, source)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(record.id)
            .bind(&record.content)
            .bind(&blob)
            .bind(&record.source)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<String>> {
        if query.len() != self.dims {
            bail!(
                "query vector has {} dimensions, store is configured for {}",
                query.len(),
                self.dims
            );
        }

        // Full scan: decode every stored vector and rank in Rust. Fine
        // for the corpus sizes this serves; an ANN index would slot in
        // behind the same trait.
        let rows = sqlx::query("SELECT content, embedding FROM documents")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f32, String)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                (l2_distance(query, &vec), row.get("content"))
            })
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, content)| content).collect())
    }
}
