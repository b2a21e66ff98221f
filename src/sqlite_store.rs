//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Vectors are stored as little-endian `f32` BLOBs in the `chunks` table,
//! namespaced by collection. Search is brute-force cosine similarity over
//! the collection in rowid (ingestion) order.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::models::{IndexedChunk, ScoredCandidate};
use docqa_core::store::VectorIndex;

/// Aggregate counts for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub documents: i64,
    pub chunks: i64,
    /// Distinct `(model, dims)` pairs present.
    pub models: Vec<(String, i64)>,
}

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn stats(&self) -> Result<CollectionStats> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT document_id), COUNT(*) FROM chunks WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_one(&self.pool)
        .await?;

        let models = sqlx::query(
            "SELECT model, dims FROM chunks WHERE collection = ? GROUP BY model, dims ORDER BY model",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
        .collect();

        Ok(CollectionStats {
            documents: row.get(0),
            chunks: row.get(1),
            models,
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, batch: &[IndexedChunk]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for item in batch {
            let chunk = &item.chunk;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, collection, document_id, chunk_index, start_offset,
                                    end_offset, text, hash, embedding, dims, model, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    collection = excluded.collection,
                    document_id = excluded.document_id,
                    chunk_index = excluded.chunk_index,
                    start_offset = excluded.start_offset,
                    end_offset = excluded.end_offset,
                    text = excluded.text,
                    hash = excluded.hash,
                    embedding = excluded.embedding,
                    dims = excluded.dims,
                    model = excluded.model
                "#,
            )
            .bind(&chunk.id)
            .bind(&self.collection)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(chunk.start as i64)
            .bind(chunk.end as i64)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(&item.vector))
            .bind(item.vector.len() as i64)
            .bind(&item.model)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<ScoredCandidate>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_index, text, embedding, dims
            FROM chunks
            WHERE collection = ?
            ORDER BY rowid
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let dims: i64 = row.get("dims");
            if dims as usize != query_vec.len() {
                bail!(
                    "collection '{}' holds {}-dimensional vectors but the query has {}; re-ingest after changing embedding models",
                    self.collection,
                    dims,
                    query_vec.len()
                );
            }
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            scored.push(ScoredCandidate {
                chunk_id: row.get("id"),
                document_id: row.get("document_id"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                score: cosine_similarity(query_vec, &vec) as f64,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::models::Chunk;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        pool
    }

    fn entry(id: &str, doc: &str, text: &str, vector: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            chunk: Chunk {
                id: id.to_string(),
                document_id: doc.to_string(),
                chunk_index: 0,
                start: 0,
                end: text.len(),
                text: text.to_string(),
                hash: String::new(),
            },
            vector,
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let index = SqliteIndex::new(memory_pool().await, "c");
        index
            .upsert(&[
                entry("a", "d1", "far", vec![0.0, 1.0]),
                entry("b", "d1", "near", vec![1.0, 0.1]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "b");
        assert_eq!(hits[0].text, "near");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ties_follow_insertion_order() {
        let index = SqliteIndex::new(memory_pool().await, "c");
        index
            .upsert(&[
                entry("z", "d1", "one", vec![1.0, 0.0]),
                entry("a", "d1", "two", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        index
            .upsert(&[entry("m", "d2", "three", vec![1.0, 0.0])])
            .await
            .unwrap();

        let ids: Vec<String> = index
            .search(&[1.0, 0.0], 5)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.chunk_id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let pool = memory_pool().await;
        let first = SqliteIndex::new(pool.clone(), "first");
        let second = SqliteIndex::new(pool, "second");
        first.upsert(&[entry("a", "d1", "x", vec![1.0])]).await.unwrap();

        assert_eq!(first.count().await.unwrap(), 1);
        assert_eq!(second.count().await.unwrap(), 0);
        assert!(second.search(&[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let index = SqliteIndex::new(memory_pool().await, "c");
        index.upsert(&[entry("a", "d1", "x", vec![1.0, 0.0, 0.0])]).await.unwrap();
        let err = index.search(&[1.0, 0.0], 5).await.unwrap_err();
        assert!(err.to_string().contains("re-ingest"));
    }

    #[tokio::test]
    async fn test_stats() {
        let index = SqliteIndex::new(memory_pool().await, "c");
        index
            .upsert(&[
                entry("a", "d1", "x", vec![1.0]),
                entry("b", "d1", "y", vec![1.0]),
                entry("c", "d2", "z", vec![1.0]),
            ])
            .await
            .unwrap();
        let stats = index.stats().await.unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.models, vec![("test-model".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_nan_scores_sort_without_panicking() {
        let index = SqliteIndex::new(memory_pool().await, "c");
        let batch: Vec<IndexedChunk> = (0..40)
            .map(|i| {
                let vector = if i % 5 == 0 {
                    vec![f32::NAN, 0.0]
                } else {
                    vec![1.0, i as f32 / 40.0]
                };
                entry(&format!("c{}", i), "d1", &format!("t{}", i), vector)
            })
            .collect();
        index.upsert(&batch).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 40).await.unwrap();
        assert_eq!(hits.len(), 40);
        let finite: Vec<f64> = hits.iter().map(|h| h.score).filter(|s| !s.is_nan()).collect();
        assert!(finite.windows(2).all(|w| w[0] >= w[1]));
    }
}
