//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use lexrag_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Renders the system and user templates with Handlebars. Every variable the
/// definition declares under `input.variables` must be supplied.
///
/// # Example
/// ```no_run
/// use lexrag_prompt::{build_prompt, load_builtin};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_builtin("grader.answer")?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "¿Qué es el IVA?".to_string());
/// vars.insert("answer".to_string(), "Un impuesto al consumo.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    for required in &definition.input.variables {
        if !variables.contains_key(required) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' requires variable '{}'",
                definition.id, required
            )));
        }
    }

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            prompt_id: definition.id.clone(),
            json_output: definition.expects_json(),
            variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputFormat, PromptInputSpec, PromptOutputSpec};

    fn create_test_definition() -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            system: Some("Grade for: {{question}}".to_string()),
            template: "Question: {{question}}".to_string(),
            input: PromptInputSpec {
                variables: vec!["question".to_string()],
            },
            output: PromptOutputSpec {
                format: OutputFormat::Json,
            },
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars);
        assert_eq!(result.unwrap(), "Question: Hello, world!");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "¿Art. 420 & \"IVA\" <19%>?".to_string());

        let result = render_template("{{question}}", &vars).unwrap();
        assert_eq!(result, "¿Art. 420 & \"IVA\" <19%>?");
    }

    #[test]
    fn test_build_prompt_renders_system_and_user() {
        let def = create_test_definition();
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Test question".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.user, "Question: Test question");
        assert_eq!(built.system.as_deref(), Some("Grade for: Test question"));
        assert!(built.metadata.json_output);
    }

    #[test]
    fn test_build_prompt_missing_variable() {
        let def = create_test_definition();
        let result = build_prompt(&def, HashMap::new());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_build_builtin_generation_prompt() {
        let def = crate::loader::load_builtin(crate::types::ids::GENERATE_CITED).unwrap();
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "¿Tarifa del IVA?".to_string());
        vars.insert("evidence".to_string(), "DOCUMENTO [1]: et.pdf".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert!(built.user.contains("¿Tarifa del IVA?"));
        assert!(built.user.contains("DOCUMENTO [1]: et.pdf"));
        assert!(built.system.unwrap().contains("[n]"));
    }
}
