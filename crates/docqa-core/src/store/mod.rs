//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only storage surface the core
//! pipeline touches, enabling pluggable backends (SQLite in the app
//! crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedChunk, ScoredCandidate};

/// Abstract similarity index over embedded chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Store a batch of embedded chunks |
/// | [`search`](VectorIndex::search) | Nearest neighbours of a query vector |
/// | [`count`](VectorIndex::count) | Number of stored chunks |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store every entry of `batch`, or none of them.
    ///
    /// An entry whose `chunk.id` is already present replaces the old one.
    /// Text duplicates under different ids are kept.
    async fn upsert(&self, batch: &[IndexedChunk]) -> Result<()>;

    /// Return up to `limit` candidates, most similar first.
    ///
    /// Ties keep insertion order. Results may contain several chunks with
    /// identical text.
    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<ScoredCandidate>>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<u64>;
}
