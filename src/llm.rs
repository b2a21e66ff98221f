//! Language-model clients implementing [`Synthesizer`].
//!
//! - **[`OpenAiChat`]**: `POST {url}/v1/chat/completions`
//! - **[`OllamaGenerate`]**: `POST {url}/api/generate` with `stream: false`
//! - **[`DisabledSynthesizer`]**: always fails; retrieval still works
//!
//! Both network clients render the same "stuff" prompt with
//! [`render_prompt`] and share the retry policy in [`crate::http`].

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use docqa_core::synth::Synthesizer;
use docqa_core::RagError;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::embedding::api_key_from_env;
use crate::http;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Fill the QA prompt with grounding context and the user's question.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        PROMPT_PREAMBLE, context, question
    )
}

pub fn create_synthesizer(config: &LlmConfig) -> Result<Arc<dyn Synthesizer>, RagError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChat::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerate::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledSynthesizer)),
        other => Err(RagError::InvalidConfig(format!(
            "Unknown llm provider: {}",
            other
        ))),
    }
}

// ============ Disabled ============

pub struct DisabledSynthesizer;

#[async_trait]
impl Synthesizer for DisabledSynthesizer {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _context: &str, _question: &str) -> Result<String> {
        bail!("LLM provider is disabled")
    }
}

// ============ OpenAI ============

pub struct OpenAiChat {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub const DEFAULT_URL: &'static str = "https://api.openai.com";

    pub fn new(config: &LlmConfig) -> Result<Self, RagError> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        let base = config.url.as_deref().unwrap_or(Self::DEFAULT_URL);
        let client = http::build_client(config.timeout_secs)
            .map_err(|e| RagError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, context: &str, question: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": render_prompt(context, question) }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
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
        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama ============

pub struct OllamaGenerate {
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerate {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434";

    pub fn new(config: &LlmConfig) -> Result<Self, RagError> {
        let base = config.url.as_deref().unwrap_or(Self::DEFAULT_URL);
        let client = http::build_client(config.timeout_secs)
            .map_err(|e| RagError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/api/generate", base.trim_end_matches('/')),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Synthesizer for OllamaGenerate {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, context: &str, question: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": render_prompt(context, question),
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
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
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
}
