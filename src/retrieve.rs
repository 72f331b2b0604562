//! Query-time retrieval: embed the query, fetch the nearest chunks.
//!
//! Retrieval is best-effort on the reply path. Any failure — embedding,
//! store, anything — degrades to an empty result with a warning, so a
//! broken retrieval layer turns the assistant into a plain chat model
//! instead of an error page.

use tracing::warn;

use crate::embedding::{embed_one, Embedder};
use crate::store::VectorStore;

/// The `k` stored chunk contents nearest to `query`, best first.
/// Returns an empty vec on any failure.
pub async fn retrieve(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Vec<String> {
    let vector = match embed_one(embedder, query).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "query embedding failed, retrieving nothing");
            return Vec::new();
        }
    };

    match store.nearest(&vector, k).await {
        Ok(contents) => contents,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "nearest-neighbor query failed, retrieving nothing");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StubEmbedder;
    use crate::migrate::run_migrations;
    use crate::models::ChunkRecord;
    use crate::store::SqliteStore;
    use anyhow::bail;
    use async_trait::async_trait;
    use sqlx::SqlitePool;

    const DIMS: usize = 16;

    async fn seeded_store(embedder: &StubEmbedder, contents: &[&str]) -> SqliteStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = SqliteStore::new(pool, DIMS);

        let texts: Vec<String> = contents.iter().map(|c| c.to_string()).collect();
        let vectors = embedder.embed(&texts).await.unwrap();
        let records: Vec<ChunkRecord> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (content, embedding))| ChunkRecord {
                id: i as i64,
                content,
                embedding,
                source: None,
            })
            .collect();
        store.insert_batch(&records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn exact_match_ranks_first() {
        let embedder = StubEmbedder::new(DIMS);
        let store = seeded_store(&embedder, &["apples", "bicycles", "rainfall"]).await;

        // The stub embeds identical text identically, so the matching
        // chunk sits at distance zero.
        let results = retrieve(&store, &embedder, "bicycles", 1).await;
        assert_eq!(results, vec!["bicycles".to_string()]);
    }

    #[tokio::test]
    async fn store_failure_degrades_to_empty() {
        struct BrokenStore;

        #[async_trait]
        impl VectorStore for BrokenStore {
            async fn insert_batch(&self, _records: &[ChunkRecord]) -> anyhow::Result<u64> {
                bail!("down")
            }
            async fn nearest(&self, _query: &[f32], _k: usize) -> anyhow::Result<Vec<String>> {
                bail!("down")
            }
        }

        let embedder = StubEmbedder::new(DIMS);
        let results = retrieve(&BrokenStore, &embedder, "anything", 3).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_empty() {
        struct BrokenEmbedder;

        #[async_trait]
        impl Embedder for BrokenEmbedder {
            fn model_name(&self) -> &str {
                "broken"
            }
            fn dims(&self) -> usize {
                DIMS
            }
            async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
                bail!("no embeddings today")
            }
        }

        let seeder = StubEmbedder::new(DIMS);
        let store = seeded_store(&seeder, &["content"]).await;
        let results = retrieve(&store, &BrokenEmbedder, "anything", 3).await;
        assert!(results.is_empty());
    }
}
