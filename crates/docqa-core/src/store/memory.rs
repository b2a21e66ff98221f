//! In-memory [`VectorIndex`] implementation for testing and WASM targets.
//!
//! Uses a `Vec` behind `std::sync::RwLock` for thread safety.
//! Search is brute-force cosine similarity over all stored vectors.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexedChunk, ScoredCandidate};

use super::VectorIndex;

/// In-memory index, kept in insertion order.
pub struct InMemoryIndex {
    entries: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, batch: &[IndexedChunk]) -> Result<()> {
        // A single write guard covers the whole batch.
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        for item in batch {
            match entries.iter_mut().find(|e| e.chunk.id == item.chunk.id) {
                Some(existing) => *existing = item.clone(),
                None => entries.push(item.clone()),
            }
        }
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<ScoredCandidate>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;

        let mut scored: Vec<ScoredCandidate> = entries
            .iter()
            .map(|e| ScoredCandidate {
                chunk_id: e.chunk.id.clone(),
                document_id: e.chunk.document_id.clone(),
                chunk_index: e.chunk.chunk_index,
                text: e.chunk.text.clone(),
                score: cosine_similarity(query_vec, &e.vector) as f64,
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        Ok(entries.len() as u64)
    }
}
