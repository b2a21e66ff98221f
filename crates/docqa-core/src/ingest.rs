//! Ingest orchestration: chunk → embed → upsert.
//!
//! Every chunk is embedded before anything is written, and the whole
//! document goes to the index in a single [`VectorIndex::upsert`] call.
//! An embedding failure therefore leaves the index untouched, and an
//! index failure never reports partial success.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::chunk::TextSplitter;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::models::{Document, IndexedChunk};
use crate::store::VectorIndex;

/// Outcome of one ingest pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    /// Chunks written to the index. `0` for an empty document.
    pub chunks: usize,
}

pub struct Ingestor {
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        batch_size: usize,
    ) -> Self {
        Self {
            splitter,
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn ingest(&self, document: &Document) -> Result<IngestReport, RagError> {
        let chunks = self.splitter.chunk_document(document);
        if chunks.is_empty() {
            debug!(document_id = %document.id, "document produced no chunks; nothing to index");
            return Ok(IngestReport {
                document_id: document.id.clone(),
                chunks: 0,
            });
        }

        let dims = self.embedder.dims();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vecs = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(RagError::embedding)?;
            if batch_vecs.len() != texts.len() {
                return Err(RagError::embedding(anyhow::anyhow!(
                    "embedder returned {} vectors for {} texts",
                    batch_vecs.len(),
                    texts.len()
                )));
            }
            if let Some(bad) = batch_vecs.iter().find(|v| v.len() != dims) {
                return Err(RagError::embedding(anyhow::anyhow!(
                    "embedding has {} dimensions, expected {}",
                    bad.len(),
                    dims
                )));
            }
            vectors.extend(batch_vecs);
        }

        let model = self.embedder.model_name().to_string();
        let records: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk {
                chunk,
                vector,
                model: model.clone(),
            })
            .collect();

        self.index.upsert(&records).await.map_err(RagError::index)?;

        info!(
            document_id = %document.id,
            source = %document.source,
            chunks = records.len(),
            "ingested document"
        );
        Ok(IngestReport {
            document_id: document.id.clone(),
            chunks: records.len(),
        })
    }
}
