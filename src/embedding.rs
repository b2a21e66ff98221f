//! Embedding provider implementations.
//!
//! Concrete [`Embedder`]s for the `docqa` binary:
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`HashingEmbedder`]**: offline feature hashing from `docqa-core`; no network calls.
//!
//! Use [`create_embedder`] to instantiate the provider named in the
//! configuration:
//!
//! ```rust
//! # use docqa::config::EmbeddingConfig;
//! # use docqa::embedding::create_embedder;
//! let config = EmbeddingConfig {
//!     provider: "hashing".to_string(),
//!     dims: 128,
//!     ..Default::default()
//! };
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "hashing");
//! assert_eq!(embedder.dims(), 128);
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use docqa_core::embedding::{Embedder, HashingEmbedder};
use docqa_core::RagError;
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::http;

/// Read an API key from the environment variable `var`.
///
/// A missing or blank variable is [`RagError::ConfigurationMissing`].
pub fn api_key_from_env(var: &str) -> Result<String, RagError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(RagError::ConfigurationMissing(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

/// Build the embedder named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dims))),
        other => Err(RagError::InvalidConfig(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST {url}/v1/embeddings`. The bearer key is read once, at
/// construction, from the variable named by `embedding.api_key_env`.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub const DEFAULT_URL: &'static str = "https://api.openai.com";

    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        let base = config.url.as_deref().unwrap_or(Self::DEFAULT_URL);
        let client = http::build_client(config.timeout_secs)
            .map_err(|e| RagError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            endpoint: format!("{}/v1/embeddings", base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json(
            &self.client,
            "OpenAI",
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding` arrays, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(position as u64);
        indexed.push((index, vec));
    }

    // Sort by index to ensure order matches input
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434";

    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let base = config.url.as_deref().unwrap_or(Self::DEFAULT_URL);
        let client = http::build_client(config.timeout_secs)
            .map_err(|e| RagError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            endpoint: format!("{}/api/embed", base.trim_end_matches('/')),
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json(
            &self.client,
            "Ollama",
            &self.endpoint,
            None,
            &body,
            self.max_retries,
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}
