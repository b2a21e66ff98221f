//! `docqa ask`: answer questions against the index.
//!
//! With a question argument, answers once. Without one, reads questions
//! from stdin until `exit`, `quit`, or end of input. The pipeline itself
//! is stateless; the loop lives here.

use anyhow::Result;
use docqa_core::models::{Answer, ScoredCandidate};
use docqa_core::{QaPipeline, RagError};
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::pipeline::build_pipeline;

/// One evidence line: `[0.9123] "<first preview_chars chars>....."`.
///
/// Line breaks inside the preview are flattened to spaces so each
/// candidate stays on one line.
pub fn format_evidence_line(candidate: &ScoredCandidate, preview_chars: usize) -> String {
    let preview = candidate.preview(preview_chars).replace(['\r', '\n'], " ");
    format!("[{:.4}] \"{}.....\"", candidate.score, preview)
}

pub fn print_evidence(evidence: &[ScoredCandidate], preview_chars: usize) {
    println!("FIRST DOCUMENTS BY RELEVANCE:");
    if evidence.is_empty() {
        println!("  (no matching chunks)");
    }
    for candidate in evidence {
        println!("  {}", format_evidence_line(candidate, preview_chars));
    }
}

fn print_answer(answer: &Answer, preview_chars: usize) {
    println!("ANSWER: \"{}\"", answer.text);
    println!();
    print_evidence(&answer.evidence, preview_chars);
}

/// Ask one question and print the result.
///
/// A synthesis failure still prints the retrieved evidence before the
/// error is returned.
async fn ask_once(
    pipeline: &QaPipeline,
    question: &str,
    k: usize,
    preview_chars: usize,
) -> Result<(), RagError> {
    println!("QUESTION: \"{}\"", question);
    match pipeline.answer_k(question, k).await {
        Ok(answer) => {
            print_answer(&answer, preview_chars);
            Ok(())
        }
        Err(err) => {
            if let Some(evidence) = err.evidence() {
                println!("ANSWER: (unavailable)");
                println!();
                print_evidence(evidence, preview_chars);
            }
            Err(err)
        }
    }
}

pub async fn run_ask(config: &Config, question: Option<String>, k: Option<usize>) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let k = k.unwrap_or(config.retrieval.k);
    let preview_chars = config.retrieval.preview_chars;

    if let Some(question) = question {
        ask_once(&pipeline, &question, k, preview_chars).await?;
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter your question (or 'exit'): ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Err(err) = ask_once(&pipeline, question, k, preview_chars).await {
            eprintln!("Error: {}", err);
        }
        println!();
    }

    Ok(())
}
