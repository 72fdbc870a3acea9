//! Binary graders: evidence relevance, answer groundedness, answer fit.
//!
//! Grader failures are never guessed around. A transport error or a reply
//! without a usable `binary_score` is returned as `AppError::Grading`.

use crate::generation::format_evidence;
use crate::prompting::{parse_json_reply, PromptRunner};
use lexrag_core::{AppError, AppResult};
use lexrag_prompt::ids;
use lexrag_retrieval::{Evidence, EvidenceSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    Relevant,
    Irrelevant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Groundedness {
    Grounded,
    Ungrounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerFit {
    Addresses,
    MissesTheMark,
}

/// Is this evidence item about the question?
#[async_trait::async_trait]
pub trait RelevanceGrader: Send + Sync {
    async fn grade(&self, evidence: &Evidence, question: &str) -> AppResult<Relevance>;
}

/// Is the answer supported by the evidence it was generated from?
#[async_trait::async_trait]
pub trait GroundednessGrader: Send + Sync {
    async fn grade_grounded(&self, evidence: &EvidenceSet, answer: &str) -> AppResult<Groundedness>;
}

/// Does the answer address the question?
#[async_trait::async_trait]
pub trait AnswerGrader: Send + Sync {
    async fn grade_addresses(&self, question: &str, answer: &str) -> AppResult<AnswerFit>;
}

/// Read `binary_score` from a grader reply.
///
/// Accepts `"yes"`/`"no"` (any case) and JSON booleans.
pub fn parse_binary_score(reply: &str) -> AppResult<bool> {
    let value = parse_json_reply(reply)
        .and_then(|v| v.get("binary_score").cloned())
        .ok_or_else(|| malformed(reply))?;

    match value {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            _ => Err(malformed(reply)),
        },
        _ => Err(malformed(reply)),
    }
}

fn malformed(reply: &str) -> AppError {
    AppError::Grading(format!("Malformed grader reply: {}", reply.trim()))
}

/// All three graders over one grading model.
#[derive(Clone)]
pub struct LlmGrader {
    runner: PromptRunner,
}

impl LlmGrader {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }

    async fn score(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<bool> {
        let reply = self
            .runner
            .run(prompt_id, variables)
            .await
            .map_err(|e| match e {
                AppError::Grading(_) | AppError::Timeout { .. } | AppError::Cancelled => e,
                other => AppError::Grading(format!("{} failed: {}", prompt_id, other)),
            })?;
        parse_binary_score(&reply)
    }
}

#[async_trait::async_trait]
impl RelevanceGrader for LlmGrader {
    async fn grade(&self, evidence: &Evidence, question: &str) -> AppResult<Relevance> {
        let relevant = self
            .score(
                ids::GRADER_RELEVANCE,
                &[("document", evidence.content.as_str()), ("question", question)],
            )
            .await?;
        Ok(if relevant {
            Relevance::Relevant
        } else {
            Relevance::Irrelevant
        })
    }
}

#[async_trait::async_trait]
impl GroundednessGrader for LlmGrader {
    async fn grade_grounded(&self, evidence: &EvidenceSet, answer: &str) -> AppResult<Groundedness> {
        let formatted = format_evidence(evidence);
        let grounded = self
            .score(
                ids::GRADER_GROUNDEDNESS,
                &[("evidence", formatted.as_str()), ("answer", answer)],
            )
            .await?;
        Ok(if grounded {
            Groundedness::Grounded
        } else {
            Groundedness::Ungrounded
        })
    }
}

#[async_trait::async_trait]
impl AnswerGrader for LlmGrader {
    async fn grade_addresses(&self, question: &str, answer: &str) -> AppResult<AnswerFit> {
        let addresses = self
            .score(ids::GRADER_ANSWER, &[("question", question), ("answer", answer)])
            .await?;
        Ok(if addresses {
            AnswerFit::Addresses
        } else {
            AnswerFit::MissesTheMark
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompting::PromptSet;
    use lexrag_llm::MockLlmClient;
    use lexrag_retrieval::{Origin, SourceHit};
    use std::sync::Arc;

    fn grader(client: Arc<MockLlmClient>) -> LlmGrader {
        LlmGrader::new(PromptRunner::new(
            client,
            "grader",
            Arc::new(PromptSet::builtin().unwrap()),
        ))
    }

    fn item(content: &str) -> Evidence {
        Evidence::from_hit(SourceHit::new(content, "et.pdf"), Origin::PrimaryIndex)
    }

    #[test]
    fn test_parse_binary_score_variants() {
        assert!(parse_binary_score(r#"{"binary_score": "yes"}"#).unwrap());
        assert!(parse_binary_score(r#"{"binary_score": "YES "}"#).unwrap());
        assert!(!parse_binary_score(r#"{"binary_score": "no"}"#).unwrap());
        assert!(parse_binary_score(r#"{"binary_score": true}"#).unwrap());
        assert!(!parse_binary_score(r#"{"binary_score": false}"#).unwrap());
    }

    #[test]
    fn test_parse_binary_score_malformed() {
        for reply in [
            "yes",
            r#"{"score": "yes"}"#,
            r#"{"binary_score": "maybe"}"#,
            r#"{"binary_score": 1}"#,
        ] {
            assert!(
                matches!(parse_binary_score(reply), Err(AppError::Grading(_))),
                "reply {:?} should be malformed",
                reply
            );
        }
    }

    #[tokio::test]
    async fn test_relevance_grade() {
        let client = Arc::new(MockLlmClient::new([
            r#"{"binary_score": "yes"}"#,
            r#"{"binary_score": "no"}"#,
        ]));
        let grader = grader(client.clone());

        let first = grader.grade(&item("Art. 468 tarifa IVA"), "¿Tarifa IVA?").await.unwrap();
        let second = grader.grade(&item("Receta de cocina"), "¿Tarifa IVA?").await.unwrap();

        assert_eq!(first, Relevance::Relevant);
        assert_eq!(second, Relevance::Irrelevant);
        assert!(client.requests()[0].prompt.contains("Art. 468 tarifa IVA"));
    }

    #[tokio::test]
    async fn test_groundedness_sees_numbered_evidence() {
        let client = Arc::new(MockLlmClient::new([r#"{"binary_score": "no"}"#]));
        let grader = grader(client.clone());
        let set = EvidenceSet::new(vec![item("La tarifa general es 19%")]);

        let verdict = grader.grade_grounded(&set, "La tarifa es 5%").await.unwrap();

        assert_eq!(verdict, Groundedness::Ungrounded);
        let prompt = &client.requests()[0].prompt;
        assert!(prompt.contains("DOCUMENTO [1]: et.pdf"));
        assert!(prompt.contains("La tarifa es 5%"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_grading_error() {
        let client = Arc::new(MockLlmClient::default());
        client.push_failure("connection refused");
        let grader = grader(client);

        let result = grader.grade_addresses("q", "a").await;
        match result {
            Err(AppError::Grading(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected grading error, got {:?}", other),
        }
    }
}
