//! Assembles a [`QaPipeline`] from configuration.
//!
//! Every collaborator is constructed here, once, at startup. Missing
//! credentials fail now as
//! [`docqa_core::RagError::ConfigurationMissing`] rather than
//! on the first request.

use anyhow::{Context, Result};
use docqa_core::store::memory::InMemoryIndex;
use docqa_core::store::VectorIndex;
use docqa_core::QaPipeline;
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::llm::create_synthesizer;
use crate::migrate;
use crate::sqlite_store::SqliteIndex;

/// Open the vector index named by `index.backend`.
pub async fn build_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match config.index.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryIndex::new())),
        _ => Ok(Arc::new(open_sqlite_index(config).await?)),
    }
}

/// Connect to the SQLite index, creating the schema if needed.
pub async fn open_sqlite_index(config: &Config) -> Result<SqliteIndex> {
    let pool = db::connect(config)
        .await
        .with_context(|| format!("Failed to open index at {}", config.index.path.display()))?;
    migrate::apply(&pool).await?;
    Ok(SqliteIndex::new(pool, config.index.collection.clone()))
}

pub async fn build_pipeline(config: &Config) -> Result<QaPipeline> {
    let embedder = create_embedder(&config.embedding)?;
    let synthesizer = create_synthesizer(&config.llm)?;
    let index = build_index(config).await?;
    let pipeline = QaPipeline::new(config.pipeline_settings(), embedder, index, synthesizer)?;
    Ok(pipeline)
}
