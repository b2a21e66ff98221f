//! # docqa core
//!
//! Shared, WASM-safe logic for docqa: data models, the overlapping text
//! splitter, collaborator traits (embedder, vector index, synthesizer),
//! the retrieval ranking algorithm, and the ingest pipeline.
//!
//! This crate contains no tokio, sqlx, network clients, or filesystem I/O.
//! Concrete collaborators live in the `docqa` application crate and are
//! injected as `Arc<dyn …>` trait objects.
//!
//! ```text
//! document ──▶ chunk ──▶ Embedder ──▶ VectorIndex::upsert
//! query ──▶ Embedder ──▶ VectorIndex::search ──▶ rank ──▶ Synthesizer ──▶ Answer
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod store;
pub mod synth;

pub use error::{ErrorKind, RagError};
pub use pipeline::{PipelineSettings, QaPipeline};
