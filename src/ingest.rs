//! Document upload: read, extract, and hand to the pipeline.
//!
//! Shared by `docqa ingest` and `POST /ingest`.

use anyhow::{Context, Result};
use docqa_core::ingest::IngestReport;
use docqa_core::models::Document;
use docqa_core::{QaPipeline, RagError};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::extract::{self, content_type_for_path};
use crate::pipeline::build_pipeline;

/// Extract text from `bytes` and ingest it as one document.
///
/// Blank extracted text is [`RagError::DocumentEmpty`]; nothing is
/// written in that case.
pub async fn ingest_bytes(
    pipeline: &QaPipeline,
    config: &Config,
    source: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<IngestReport, RagError> {
    extract::check_size(bytes.len() as u64, config.index.max_document_bytes)
        .map_err(|e| RagError::Extraction(e.to_string()))?;
    let text = extract::extract_text(bytes, content_type)
        .map_err(|e| RagError::Extraction(e.to_string()))?;

    let document = Document::new(source, content_type, text);
    if document.is_blank() {
        return Err(RagError::DocumentEmpty);
    }
    pipeline.ingest(&document).await
}

/// Run the ingest command for one file.
pub async fn run_ingest(config: &Config, path: &Path, content_type: Option<String>) -> Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    extract::check_size(meta.len(), config.index.max_document_bytes)?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let content_type =
        content_type.unwrap_or_else(|| content_type_for_path(path).to_string());
    let pipeline = build_pipeline(config).await?;
    let source = path.display().to_string();

    info!(path = %source, content_type = %content_type, bytes = bytes.len(), "ingesting");

    match ingest_bytes(&pipeline, config, &source, &content_type, &bytes).await {
        Ok(report) => {
            println!(
                "Ingested {} ({} chunk{}) as document {}",
                source,
                report.chunks,
                if report.chunks == 1 { "" } else { "s" },
                report.document_id
            );
            Ok(())
        }
        Err(RagError::DocumentEmpty) => {
            println!("No extractable text in {}; nothing was indexed.", source);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to ingest {}", source))),
    }
}
