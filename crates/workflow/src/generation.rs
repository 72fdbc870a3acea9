//! Answer generation.
//!
//! Evidence is shown to the model numbered `[1]..[k]` in set order, which is
//! the numbering citation markers refer back to.

use crate::citations::Citation;
use crate::prompting::PromptRunner;
use lexrag_core::{AppError, AppResult};
use lexrag_prompt::ids;
use lexrag_retrieval::EvidenceSet;
use serde::{Deserialize, Serialize};

/// Produces answer text from a question and an evidence set.
#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generator name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, question: &str, evidence: &EvidenceSet) -> AppResult<String>;
}

/// One generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub text: String,
    pub citations: Vec<Citation>,
    /// Produced by the plain fallback generator
    pub degraded: bool,
    /// All required section headings were found
    pub has_structure: bool,
}

/// Render evidence as numbered blocks.
pub fn format_evidence(evidence: &EvidenceSet) -> String {
    if evidence.is_empty() {
        return "(no documents)".to_string();
    }

    evidence
        .iter()
        .enumerate()
        .map(|(i, item)| format!("DOCUMENTO [{}]: {}\n{}", i + 1, item.source_id, item.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Whether every heading in `sections` appears in `text` (case-insensitive).
pub fn has_structure(text: &str, sections: &[String]) -> bool {
    let upper = text.to_uppercase();
    sections
        .iter()
        .all(|section| upper.contains(&section.to_uppercase()))
}

/// Structured generator that cites evidence with `[n]` markers.
pub struct CitedGenerator {
    runner: PromptRunner,
}

impl CitedGenerator {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for CitedGenerator {
    fn name(&self) -> &str {
        "cited"
    }

    async fn generate(&self, question: &str, evidence: &EvidenceSet) -> AppResult<String> {
        run_generation(&self.runner, ids::GENERATE_CITED, question, evidence).await
    }
}

/// Plain generator used when the cited one fails.
pub struct PlainGenerator {
    runner: PromptRunner,
}

impl PlainGenerator {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for PlainGenerator {
    fn name(&self) -> &str {
        "plain"
    }

    async fn generate(&self, question: &str, evidence: &EvidenceSet) -> AppResult<String> {
        run_generation(&self.runner, ids::GENERATE_PLAIN, question, evidence).await
    }
}

async fn run_generation(
    runner: &PromptRunner,
    prompt_id: &str,
    question: &str,
    evidence: &EvidenceSet,
) -> AppResult<String> {
    let formatted = format_evidence(evidence);
    let text = runner
        .run(
            prompt_id,
            &[("question", question), ("evidence", formatted.as_str())],
        )
        .await
        .map_err(|e| match e {
            AppError::Timeout { .. } | AppError::Cancelled => e,
            other => AppError::Generation(format!("{} failed: {}", prompt_id, other)),
        })?;

    if text.trim().is_empty() {
        return Err(AppError::Generation(format!(
            "{} returned an empty answer",
            prompt_id
        )));
    }

    Ok(text.trim().to_string())
}
