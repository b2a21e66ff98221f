//! Error type shared by every pipeline stage.
//!
//! Collaborators (embedders, indexes, language models) report failures as
//! `anyhow::Error`; the core wraps each one in the variant for the stage
//! that made the call, so callers can tell *where* things went wrong.

use crate::models::ScoredCandidate;

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    InvalidConfig,
    DocumentEmpty,
    EmptyQuery,
    ExtractionFailure,
    EmbeddingFailure,
    IndexFailure,
    SynthesisFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationMissing => "configuration_missing",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::DocumentEmpty => "document_empty",
            ErrorKind::EmptyQuery => "empty_query",
            ErrorKind::ExtractionFailure => "extraction_failure",
            ErrorKind::EmbeddingFailure => "embedding_failure",
            ErrorKind::IndexFailure => "index_failure",
            ErrorKind::SynthesisFailure => "synthesis_failure",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("document contains no extractable text")]
    DocumentEmpty,

    #[error("question must not be empty")]
    EmptyQuery,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("embedding failed: {source}")]
    Embedding {
        #[source]
        source: anyhow::Error,
    },

    #[error("vector index failed: {source}")]
    Index {
        #[source]
        source: anyhow::Error,
    },

    /// Retrieval succeeded but the language model did not produce an
    /// answer. `evidence` holds the ranked candidates so they can still
    /// be shown.
    #[error("answer synthesis failed: {source}")]
    Synthesis {
        #[source]
        source: anyhow::Error,
        evidence: Vec<ScoredCandidate>,
    },
}

impl RagError {
    pub fn embedding(source: impl Into<anyhow::Error>) -> Self {
        Self::Embedding {
            source: source.into(),
        }
    }

    pub fn index(source: impl Into<anyhow::Error>) -> Self {
        Self::Index {
            source: source.into(),
        }
    }

    pub fn synthesis(source: impl Into<anyhow::Error>, evidence: Vec<ScoredCandidate>) -> Self {
        Self::Synthesis {
            source: source.into(),
            evidence,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::ConfigurationMissing(_) => ErrorKind::ConfigurationMissing,
            RagError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            RagError::DocumentEmpty => ErrorKind::DocumentEmpty,
            RagError::EmptyQuery => ErrorKind::EmptyQuery,
            RagError::Extraction(_) => ErrorKind::ExtractionFailure,
            RagError::Embedding { .. } => ErrorKind::EmbeddingFailure,
            RagError::Index { .. } => ErrorKind::IndexFailure,
            RagError::Synthesis { .. } => ErrorKind::SynthesisFailure,
        }
    }

    /// Evidence retrieved before the failure, if any survived it.
    pub fn evidence(&self) -> Option<&[ScoredCandidate]> {
        match self {
            RagError::Synthesis { evidence, .. } => Some(evidence),
            _ => None,
        }
    }
}
