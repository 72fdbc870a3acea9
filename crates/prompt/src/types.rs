//! Prompt definitions as stored in YAML, and the prompts rendered from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prompt identifiers used by the answering workflow.
pub mod ids {
    pub const ROUTER_CLASSIFY: &str = "router.classify";
    pub const GRADER_RELEVANCE: &str = "grader.relevance";
    pub const GRADER_GROUNDEDNESS: &str = "grader.groundedness";
    pub const GRADER_ANSWER: &str = "grader.answer";
    pub const GENERATE_CITED: &str = "generate.cited";
    pub const GENERATE_PLAIN: &str = "generate.plain";

    /// Every prompt the workflow needs.
    pub const ALL: [&str; 6] = [
        ROUTER_CLASSIFY,
        GRADER_RELEVANCE,
        GRADER_GROUNDEDNESS,
        GRADER_ANSWER,
        GENERATE_CITED,
        GENERATE_PLAIN,
    ];
}

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Schema version, "major.minor"
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System message template (optional)
    #[serde(default)]
    pub system: Option<String>,

    /// User message template with Handlebars syntax
    pub template: String,

    #[serde(default)]
    pub input: PromptInputSpec,

    pub output: PromptOutputSpec,
}

impl PromptDefinition {
    /// Whether the prompt asks the model for a JSON object.
    pub fn expects_json(&self) -> bool {
        self.output.format == OutputFormat::Json
    }

    /// Declared variables that neither template mentions.
    pub fn unreferenced_variables(&self) -> Vec<&str> {
        self.input
            .variables
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let needle = format!("{{{{{}}}}}", name);
                !self.template.contains(&needle)
                    && !self.system.as_deref().is_some_and(|s| s.contains(&needle))
            })
            .collect()
    }
}

/// Variables a caller must bind before rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInputSpec {
    /// Variables the caller must supply
    #[serde(default)]
    pub variables: Vec<String>,
}

/// Expected reply shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    pub format: OutputFormat,
}

/// What the model is asked to reply with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Free prose (generators)
    Text,
    /// One JSON object (router and graders)
    Json,
}

/// Where a prompt definition was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    /// Compiled into the binary
    Builtin,
    /// `.lexrag/prompts/<id>.yml` in the workspace
    Workspace,
}

/// A rendered prompt, ready to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub system: Option<String>,
    pub user: String,
    pub metadata: BuiltPromptMetadata,
}

/// Provenance of a [`BuiltPrompt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPromptMetadata {
    pub prompt_id: String,

    /// The model should answer with a JSON object
    pub json_output: bool,

    /// Variables the templates were rendered with
    pub variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
system: "You grade things."
input:
  variables: [question]
template: "{{question}}"
output:
  format: json
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.system.as_deref(), Some("You grade things."));
        assert_eq!(def.input.variables, vec!["question".to_string()]);
        assert!(def.expects_json());
        assert!(def.unreferenced_variables().is_empty());
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let yaml = r#"
id: test.prompt
title: Test
apiVersion: "1.0"
template: "x"
output:
  format: xml
"#;
        assert!(serde_yaml::from_str::<PromptDefinition>(yaml).is_err());
    }

    #[test]
    fn test_unreferenced_variables() {
        let yaml = r#"
id: test.prompt
title: Test
apiVersion: "1.0"
system: "Context: {{evidence}}"
input:
  variables: [evidence, question, answer]
template: "Q: {{question}}"
output:
  format: text
"#;
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.unreferenced_variables(), vec!["answer"]);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let built = BuiltPrompt {
            system: None,
            user: "¿Tarifa del IVA?".to_string(),
            metadata: BuiltPromptMetadata {
                prompt_id: ids::GRADER_ANSWER.to_string(),
                json_output: true,
                variables: HashMap::new(),
            },
        };

        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(json["metadata"]["promptId"], "grader.answer");
        assert_eq!(json["metadata"]["jsonOutput"], true);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut all = ids::ALL.to_vec();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), ids::ALL.len());
    }
}
