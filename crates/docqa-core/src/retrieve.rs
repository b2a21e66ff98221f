//! Query-time retrieval: embed, search, dedupe, rank.
//!
//! # Ranking Algorithm
//!
//! 1. Embed the query (one [`Embedder`] call).
//! 2. Fetch `max(k, candidate_k)` candidates from the [`VectorIndex`].
//! 3. Dedupe by exact chunk text, keeping the highest score at the
//!    position of the first occurrence.
//! 4. Stable sort by score (desc); ties keep index order.
//! 5. Truncate to `k`.
//!
//! When dedupe leaves fewer than `k` candidates and the index filled the
//! whole page, the search limit doubles and steps 2-5 repeat. Repeated
//! ingests of the same text therefore never crowd out distinct chunks.
//!
//! Scores are passed through exactly as the index reported them.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::RagError;
use crate::models::ScoredCandidate;
use crate::store::VectorIndex;

/// Embeds queries and ranks index hits.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    candidate_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        candidate_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            candidate_k,
        }
    }

    /// Return up to `k` deduplicated candidates for `query`, best first.
    ///
    /// A blank query yields an empty list without touching either
    /// collaborator.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredCandidate>, RagError> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be at least 1".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RagError::embedding)?;
        let dims = self.embedder.dims();
        if query_vec.len() != dims {
            return Err(RagError::embedding(anyhow::anyhow!(
                "query embedding has {} dimensions, expected {}",
                query_vec.len(),
                dims
            )));
        }

        let mut limit = k.max(self.candidate_k);
        loop {
            let candidates = self
                .index
                .search(&query_vec, limit)
                .await
                .map_err(RagError::index)?;
            let fetched = candidates.len();

            let ranked = rank_candidates(candidates, k);
            if ranked.len() >= k || fetched < limit || limit == usize::MAX {
                debug!(fetched, returned = ranked.len(), k, "retrieval complete");
                return Ok(ranked);
            }
            debug!(
                fetched,
                unique = ranked.len(),
                k,
                "duplicates crowded the page; widening search"
            );
            limit = limit.saturating_mul(2);
        }
    }
}

/// Dedupe by text, sort by score descending (stable), keep the top `k`.
///
/// # Example
///
/// ```rust
/// use docqa_core::models::ScoredCandidate;
/// use docqa_core::retrieve::rank_candidates;
///
/// let hit = |id: &str, text: &str, score: f64| ScoredCandidate {
///     chunk_id: id.into(),
///     document_id: "d".into(),
///     chunk_index: 0,
///     text: text.into(),
///     score,
/// };
/// let ranked = rank_candidates(vec![hit("a", "same", 0.87), hit("b", "same", 0.91)], 4);
/// assert_eq!(ranked.len(), 1);
/// assert_eq!(ranked[0].chunk_id, "b");
/// ```
pub fn rank_candidates(candidates: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
    let mut unique: Vec<ScoredCandidate> = Vec::with_capacity(candidates.len());
    let mut slot_by_text: HashMap<String, usize> = HashMap::new();

    for cand in candidates {
        match slot_by_text.get(&cand.text) {
            Some(&slot) => {
                if cand.score > unique[slot].score {
                    unique[slot] = cand;
                }
            }
            None => {
                slot_by_text.insert(cand.text.clone(), unique.len());
                unique.push(cand);
            }
        }
    }

    unique.sort_by(|a, b| b.score.total_cmp(&a.score));
    unique.truncate(k);
    unique
}
