//! Source routing.
//!
//! A question whose topic matches the secondary label always goes to the
//! secondary index. Everything else is classified by the LLM; a classifier
//! that fails for any reason routes to the primary index.

use crate::prompting::{parse_json_reply, PromptRunner};
use lexrag_core::{AppError, AppResult};
use lexrag_prompt::ids;
use lexrag_retrieval::SourceSelector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteDecision {
    Retrieve(SourceSelector),
    WebSearch,
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::Retrieve(selector) => write!(f, "retrieve:{}", selector.as_str()),
            RouteDecision::WebSearch => write!(f, "websearch"),
        }
    }
}

/// Classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datasource {
    NeedsWebSearch,
    NeedsDocumentRetrieval,
}

impl Datasource {
    fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "websearch" | "web_search" => Some(Datasource::NeedsWebSearch),
            "vectorstore" | "vector_store" => Some(Datasource::NeedsDocumentRetrieval),
            _ => None,
        }
    }
}

/// Decides whether a question needs document retrieval or web search.
#[async_trait::async_trait]
pub trait QuestionClassifier: Send + Sync {
    async fn classify(&self, question: &str) -> AppResult<Datasource>;
}

/// Classifier backed by the `router.classify` prompt.
pub struct LlmQuestionClassifier {
    runner: PromptRunner,
}

impl LlmQuestionClassifier {
    pub fn new(runner: PromptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait::async_trait]
impl QuestionClassifier for LlmQuestionClassifier {
    async fn classify(&self, question: &str) -> AppResult<Datasource> {
        let reply = self
            .runner
            .run(ids::ROUTER_CLASSIFY, &[("question", question)])
            .await?;
        parse_datasource(&reply)
    }
}

/// Parse `{"datasource": "websearch" | "vectorstore"}`.
pub fn parse_datasource(reply: &str) -> AppResult<Datasource> {
    parse_json_reply(reply)
        .and_then(|value| {
            value
                .get("datasource")
                .and_then(|v| v.as_str())
                .and_then(Datasource::parse)
        })
        .ok_or_else(|| AppError::Llm(format!("Malformed classifier reply: {}", reply.trim())))
}

/// Whether `topic` names the secondary source.
pub fn topic_selects_secondary(topic: Option<&str>, secondary_label: &str) -> bool {
    topic
        .map(|t| t.trim().eq_ignore_ascii_case(secondary_label.trim()))
        .unwrap_or(false)
}

/// Map a classifier outcome to a route. Failures route to the primary index.
pub fn route_from_classification(classification: AppResult<Datasource>) -> RouteDecision {
    match classification {
        Ok(Datasource::NeedsWebSearch) => RouteDecision::WebSearch,
        Ok(Datasource::NeedsDocumentRetrieval) => RouteDecision::Retrieve(SourceSelector::Primary),
        Err(e) => {
            tracing::warn!("Question classifier failed, using primary index: {}", e);
            RouteDecision::Retrieve(SourceSelector::Primary)
        }
    }
}

/// Topic override plus classifier.
#[derive(Clone)]
pub struct SourceRouter {
    classifier: Arc<dyn QuestionClassifier>,
    secondary_topic: String,
}

impl SourceRouter {
    pub fn new(classifier: Arc<dyn QuestionClassifier>, secondary_topic: impl Into<String>) -> Self {
        Self {
            classifier,
            secondary_topic: secondary_topic.into(),
        }
    }

    /// Route without consulting the classifier, if the topic decides it.
    pub fn route_by_topic(&self, topic: Option<&str>) -> Option<RouteDecision> {
        topic_selects_secondary(topic, &self.secondary_topic)
            .then_some(RouteDecision::Retrieve(SourceSelector::Secondary))
    }

    pub fn classifier(&self) -> &Arc<dyn QuestionClassifier> {
        &self.classifier
    }
}
