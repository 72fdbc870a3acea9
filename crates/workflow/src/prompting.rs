//! Prompt-backed LLM calls shared by the router, graders and generators.

use lexrag_core::{AppError, AppResult};
use lexrag_llm::{LlmClient, LlmRequest};
use lexrag_prompt::{build_prompt, ids, load_builtin, load_prompt, PromptDefinition, PromptOrigin};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Every workflow prompt, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptSet {
    /// Built-in definitions only.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in ids::ALL {
            definitions.insert(id.to_string(), load_builtin(id)?);
        }
        Ok(Self { definitions })
    }

    /// Built-ins with `.lexrag/prompts/` overrides applied.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in ids::ALL {
            let (definition, origin) = load_prompt(workspace, id)?;
            if origin == PromptOrigin::Workspace {
                tracing::info!("Using workspace prompt override for {}", id);
            }
            definitions.insert(id.to_string(), definition);
        }
        Ok(Self { definitions })
    }

    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", id)))
    }
}

/// Renders a prompt and sends it to one model.
#[derive(Clone)]
pub struct PromptRunner {
    client: Arc<dyn LlmClient>,
    model: String,
    prompts: Arc<PromptSet>,
}

impl PromptRunner {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompts: Arc<PromptSet>) -> Self {
        Self {
            client,
            model: model.into(),
            prompts,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render `prompt_id` with `variables` and return the raw completion text.
    pub async fn run(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<String> {
        let definition = self.prompts.get(prompt_id)?;
        let variables: HashMap<String, String> = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let built = build_prompt(definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.0);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if built.metadata.json_output {
            request = request.with_json_output();
        }

        tracing::trace!(
            "Calling {} ({}) with prompt {}",
            self.client.provider_name(),
            self.model,
            prompt_id
        );
        let response = self.client.complete(&request).await?;
        tracing::debug!(
            prompt = prompt_id,
            model = %response.model,
            tokens = response.usage.total(),
            "Completion received"
        );
        if response.truncated {
            tracing::warn!("Reply to {} hit the token limit and may be incomplete", prompt_id);
        }
        Ok(response.content)
    }
}

/// Parse a JSON object from a model reply, tolerating surrounding prose or
/// code fences.
pub(crate) fn parse_json_reply(content: &str) -> Option<serde_json::Value> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return value.is_object().then_some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&trimmed[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_llm::{MockLlmClient, ResponseFormat};
    use tempfile::TempDir;

    #[test]
    fn test_builtin_set_has_every_prompt() {
        let set = PromptSet::builtin().unwrap();
        for id in ids::ALL {
            assert!(set.get(id).is_ok());
        }
        assert!(set.get("missing.prompt").is_err());
    }

    #[test]
    fn test_load_without_overrides() {
        let temp = TempDir::new().unwrap();
        let set = PromptSet::load(temp.path()).unwrap();
        assert_eq!(set.get(ids::GRADER_ANSWER).unwrap().id, ids::GRADER_ANSWER);
    }

    #[tokio::test]
    async fn test_runner_builds_request() {
        let client = Arc::new(MockLlmClient::new([r#"{"binary_score": "yes"}"#]));
        let runner = PromptRunner::new(
            client.clone(),
            "grader-model",
            Arc::new(PromptSet::builtin().unwrap()),
        );

        let reply = runner
            .run(
                ids::GRADER_ANSWER,
                &[("question", "¿Tarifa del IVA?"), ("answer", "19%")],
            )
            .await
            .unwrap();

        assert!(reply.contains("yes"));
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "grader-model");
        assert_eq!(requests[0].format, ResponseFormat::Json);
        assert!(requests[0].prompt.contains("¿Tarifa del IVA?"));
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn test_runner_missing_variable() {
        let client = Arc::new(MockLlmClient::new(["unused"]));
        let runner = PromptRunner::new(client.clone(), "m", Arc::new(PromptSet::builtin().unwrap()));

        let result = runner.run(ids::GRADER_ANSWER, &[("question", "q")]).await;
        assert!(matches!(result, Err(AppError::Prompt(_))));
        assert!(client.requests().is_empty());
    }

    #[test]
    fn test_parse_json_reply() {
        assert!(parse_json_reply(r#"{"binary_score": "yes"}"#).is_some());
        assert!(parse_json_reply("```json\n{\"binary_score\": \"no\"}\n```").is_some());
        assert!(parse_json_reply("yes").is_none());
        assert!(parse_json_reply("[1, 2]").is_none());
        assert!(parse_json_reply("} nope {").is_none());
    }
}
