//! `docqa search`: show ranked evidence for a query without calling the LLM.

use anyhow::Result;

use crate::ask::print_evidence;
use crate::config::Config;
use crate::pipeline::build_pipeline;

pub async fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let k = k.unwrap_or(config.retrieval.k);
    let hits = pipeline.retrieve_k(query, k).await?;
    print_evidence(&hits, config.retrieval.preview_chars);
    Ok(())
}
