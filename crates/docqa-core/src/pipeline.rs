//! The assembled question-answering pipeline.
//!
//! [`QaPipeline`] wires one [`TextSplitter`], one [`Embedder`], one
//! [`VectorIndex`] and one [`Synthesizer`] together. It holds no session
//! state: each call is an independent request.

use std::sync::Arc;

use tracing::info;

use crate::chunk::{OversizedUnits, TextSplitter};
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::ingest::{IngestReport, Ingestor};
use crate::models::{Answer, Document, ScoredCandidate};
use crate::retrieve::Retriever;
use crate::store::VectorIndex;
use crate::synth::{synthesize, Synthesizer};

/// Chunking and retrieval parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub separator: String,
    pub chunk_size: usize,
    pub overlap: usize,
    pub oversized_units: OversizedUnits,
    /// Results per question.
    pub k: usize,
    /// Candidates fetched from the index before dedupe.
    pub candidate_k: usize,
    pub embed_batch_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            chunk_size: 800,
            overlap: 200,
            oversized_units: OversizedUnits::Preserve,
            k: 4,
            candidate_k: 16,
            embed_batch_size: 64,
        }
    }
}

impl PipelineSettings {
    /// Check every value once, before any collaborator is called.
    pub fn validate(&self) -> Result<(), RagError> {
        TextSplitter::new(self.separator.clone(), self.chunk_size, self.overlap)?;
        if self.k == 0 {
            return Err(RagError::InvalidConfig("retrieval.k must be at least 1".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::InvalidConfig(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct QaPipeline {
    settings: PipelineSettings,
    ingestor: Ingestor,
    retriever: Retriever,
    synthesizer: Arc<dyn Synthesizer>,
}

impl QaPipeline {
    pub fn new(
        settings: PipelineSettings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Result<Self, RagError> {
        settings.validate()?;
        let splitter = TextSplitter::new(
            settings.separator.clone(),
            settings.chunk_size,
            settings.overlap,
        )?
        .with_oversized_units(settings.oversized_units);

        info!(
            embedder = embedder.model_name(),
            dims = embedder.dims(),
            llm = synthesizer.model_name(),
            chunk_size = settings.chunk_size,
            overlap = settings.overlap,
            "pipeline ready"
        );

        Ok(Self {
            ingestor: Ingestor::new(
                splitter,
                embedder.clone(),
                index.clone(),
                settings.embed_batch_size,
            ),
            retriever: Retriever::new(embedder, index, settings.candidate_k),
            settings,
            synthesizer,
        })
    }

    pub async fn ingest(&self, document: &Document) -> Result<IngestReport, RagError> {
        self.ingestor.ingest(document).await
    }

    /// Retrieve with the configured `k`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredCandidate>, RagError> {
        self.retriever.retrieve(query, self.settings.k).await
    }

    pub async fn retrieve_k(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredCandidate>, RagError> {
        self.retriever.retrieve(query, k).await
    }

    /// Retrieve evidence for `question` and synthesize an answer from it.
    pub async fn answer(&self, question: &str) -> Result<Answer, RagError> {
        self.answer_k(question, self.settings.k).await
    }

    pub async fn answer_k(&self, question: &str, k: usize) -> Result<Answer, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let evidence = self.retriever.retrieve(question, k).await?;
        synthesize(self.synthesizer.as_ref(), question, evidence).await
    }
}
