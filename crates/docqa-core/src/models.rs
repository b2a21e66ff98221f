//! Core data models that flow through ingest and retrieval.

use serde::Serialize;
use uuid::Uuid;

/// Raw extracted text of one upload.
///
/// Every upload gets a fresh id, so uploading the same text twice yields
/// two documents (and duplicate chunks in the index, masked at query time).
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Where the text came from (file path, `"http"`, …).
    pub source: String,
    pub content_type: String,
    pub text: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

impl Document {
    pub fn new(
        source: impl Into<String>,
        content_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            content_type: content_type.into(),
            text: text.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// True when there is nothing worth indexing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous span of a [`Document`]'s text.
///
/// `text == document.text[start..end]`; `start`/`end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// SHA-256 hex of `text`.
    pub hash: String,
}

/// A chunk plus its embedding, as handed to a [`VectorIndex`](crate::store::VectorIndex).
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    /// Embedding model that produced `vector`.
    pub model: String,
}

/// One search hit: a chunk and the index's similarity score for it.
///
/// Higher scores are more similar. The score is whatever the index
/// reports natively; nothing in the core rescales it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub score: f64,
}

impl ScoredCandidate {
    /// The first `max_chars` characters of the chunk text.
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

/// A synthesized answer and the evidence it was grounded on, in rank order.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub evidence: Vec<ScoredCandidate>,
}
