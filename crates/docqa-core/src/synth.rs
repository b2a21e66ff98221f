//! Answer synthesis wrapper.
//!
//! Hands the ranked evidence, in the order given, to a [`Synthesizer`]
//! and returns its trimmed output. Nothing here re-ranks or filters.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::RagError;
use crate::models::{Answer, ScoredCandidate};

/// Separator placed between candidate texts in the grounding context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Language model that turns grounding context plus a question into prose.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, context: &str, question: &str) -> Result<String>;
}

/// Join candidate texts, in order, into one context string.
pub fn build_context(candidates: &[ScoredCandidate]) -> String {
    candidates
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Ask `synth` to answer `question` from `candidates`.
///
/// A collaborator error or a blank completion becomes
/// [`RagError::Synthesis`], which keeps `candidates` as evidence.
pub async fn synthesize(
    synth: &dyn Synthesizer,
    question: &str,
    candidates: Vec<ScoredCandidate>,
) -> Result<Answer, RagError> {
    let context = build_context(&candidates);
    debug!(
        model = synth.model_name(),
        evidence = candidates.len(),
        context_chars = context.chars().count(),
        "synthesizing answer"
    );

    let raw = match synth.complete(&context, question).await {
        Ok(raw) => raw,
        Err(e) => return Err(RagError::synthesis(e, candidates)),
    };

    let text = raw.trim();
    if text.is_empty() {
        return Err(RagError::synthesis(
            anyhow::anyhow!("language model returned an empty answer"),
            candidates,
        ));
    }

    Ok(Answer {
        question: question.to_string(),
        text: text.to_string(),
        evidence: candidates,
    })
}
