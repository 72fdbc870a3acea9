//! Caller-facing answer.

use crate::citations::Citation;
use lexrag_core::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    /// Passed groundedness and answer checks
    Verified,
    /// Accepted after the retry bound
    Unverified,
    /// No answer could be produced
    Failed,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Verified => "verified",
            AnswerStatus::Unverified => "unverified",
            AnswerStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub answer_text: String,
    pub citations: Vec<Citation>,
    /// Evidence items the final answer was generated from
    pub evidence_used: usize,
    pub used_fallback: bool,
    pub retry_count: u32,
    pub status: AnswerStatus,
    /// Produced by the plain fallback generator, without citations
    pub degraded: bool,
}

impl AnswerResponse {
    /// Apology returned when a run cannot produce an answer.
    pub fn failure(error: &AppError) -> Self {
        let answer_text = match error {
            AppError::Cancelled => "La consulta fue cancelada antes de completarse.".to_string(),
            _ => "Lo siento, no fue posible generar una respuesta a su consulta en este momento. \
                  Por favor, intente de nuevo más tarde."
                .to_string(),
        };

        Self {
            answer_text,
            citations: Vec::new(),
            evidence_used: 0,
            used_fallback: false,
            retry_count: 0,
            status: AnswerStatus::Failed,
            degraded: false,
        }
    }
}
