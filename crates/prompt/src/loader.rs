//! Prompt loader for YAML prompt definitions.
//!
//! Every prompt the workflow uses ships as a built-in definition. A file named
//! `<id>.yml` in the workspace's `.lexrag/prompts/` directory replaces the
//! built-in with the same id.

use crate::types::{ids, PromptDefinition, PromptOrigin};
use lexrag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Built-in prompt sources, keyed by id.
const BUILTIN_PROMPTS: [(&str, &str); 6] = [
    (
        ids::ROUTER_CLASSIFY,
        include_str!("../prompts/router.classify.yml"),
    ),
    (
        ids::GRADER_RELEVANCE,
        include_str!("../prompts/grader.relevance.yml"),
    ),
    (
        ids::GRADER_GROUNDEDNESS,
        include_str!("../prompts/grader.groundedness.yml"),
    ),
    (ids::GRADER_ANSWER, include_str!("../prompts/grader.answer.yml")),
    (
        ids::GENERATE_CITED,
        include_str!("../prompts/generate.cited.yml"),
    ),
    (
        ids::GENERATE_PLAIN,
        include_str!("../prompts/generate.plain.yml"),
    ),
];

/// Directory holding workspace prompt overrides.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".lexrag").join("prompts")
}

/// Load a prompt definition by ID.
///
/// Looks for `.lexrag/prompts/<id>.yml` first and falls back to the built-in
/// definition.
///
/// # Example
/// ```no_run
/// use lexrag_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (prompt, origin) = load_prompt(Path::new("."), "grader.relevance")?;
/// println!("Loaded prompt: {} ({:?})", prompt.title, origin);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(
    workspace_path: &Path,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptOrigin)> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file, definition.id, prompt_id
            )));
        }

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok((definition, PromptOrigin::Workspace));
    }

    load_builtin(prompt_id).map(|def| (def, PromptOrigin::Builtin))
}

/// Load a built-in prompt definition.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt id: {}", prompt_id)))?;

    parse_prompt(contents, &format!("builtin:{}", prompt_id))
}

/// List every known prompt id with the origin that `load_prompt` would use.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<(String, PromptOrigin)>> {
    let mut overrides = Vec::new();
    let dir = prompts_dir(workspace_path);

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    overrides.push(stem.to_string());
                }
            }
        }
    }

    let mut listing: Vec<(String, PromptOrigin)> = BUILTIN_PROMPTS
        .iter()
        .map(|(id, _)| {
            let origin = if overrides.iter().any(|o| o == id) {
                PromptOrigin::Workspace
            } else {
                PromptOrigin::Builtin
            };
            (id.to_string(), origin)
        })
        .collect();

    // Extra workspace prompts are listed even though the workflow ignores them
    for id in overrides {
        if !listing.iter().any(|(known, _)| *known == id) {
            listing.push((id, PromptOrigin::Workspace));
        }
    }

    listing.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listing)
}

fn parse_prompt(contents: &str, location: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", location, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // An override that drops {{evidence}} would grade or answer blind
    let missing = def.unreferenced_variables();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} declares variables its templates never use: {}",
            def.id,
            missing.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, body: &str) -> PathBuf {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        let file_path = prompts.join(format!("{}.yml", id));
        fs::write(&file_path, body).unwrap();
        file_path
    }

    fn valid_override(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Stricter relevance"
apiVersion: "1.1"
template: "Doc: {{{{document}}}} Q: {{{{question}}}}"
input:
  variables: [document, question]
output:
  format: json
"#,
            id
        )
    }

    #[test]
    fn test_all_builtins_parse() {
        for id in ids::ALL {
            let def = load_builtin(id).unwrap();
            assert_eq!(def.id, id);
        }
    }

    #[test]
    fn test_builtin_output_formats() {
        assert!(load_builtin(ids::GRADER_RELEVANCE).unwrap().expects_json());
        assert!(load_builtin(ids::ROUTER_CLASSIFY).unwrap().expects_json());
        assert!(!load_builtin(ids::GENERATE_CITED).unwrap().expects_json());
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let (def, origin) = load_prompt(temp_dir.path(), ids::GRADER_ANSWER).unwrap();
        assert_eq!(def.id, ids::GRADER_ANSWER);
        assert_eq!(origin, PromptOrigin::Builtin);
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            ids::GRADER_RELEVANCE,
            &valid_override(ids::GRADER_RELEVANCE),
        );

        let (def, origin) = load_prompt(temp_dir.path(), ids::GRADER_RELEVANCE).unwrap();
        assert_eq!(origin, PromptOrigin::Workspace);
        assert_eq!(def.title, "Stricter relevance");
    }

    #[test]
    fn test_override_with_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            ids::GRADER_RELEVANCE,
            &valid_override("something.else"),
        );

        assert!(load_prompt(temp_dir.path(), ids::GRADER_RELEVANCE).is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), ids::GRADER_ANSWER, "invalid: yaml: content:");

        assert!(load_prompt(temp_dir.path(), ids::GRADER_ANSWER).is_err());
    }

    #[test]
    fn test_override_must_use_declared_variables() {
        let temp_dir = TempDir::new().unwrap();
        let body = valid_override(ids::GRADER_RELEVANCE).replace("Doc: {{document}} ", "");
        write_override(temp_dir.path(), ids::GRADER_RELEVANCE, &body);

        let err = load_prompt(temp_dir.path(), ids::GRADER_RELEVANCE).unwrap_err();
        assert!(err.to_string().contains("document"));
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            ids::GRADER_RELEVANCE,
            &valid_override(ids::GRADER_RELEVANCE),
        );
        write_override(temp_dir.path(), "custom.extra", &valid_override("custom.extra"));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), ids::ALL.len() + 1);
        assert!(prompts.contains(&(ids::GRADER_RELEVANCE.to_string(), PromptOrigin::Workspace)));
        assert!(prompts.contains(&(ids::GENERATE_CITED.to_string(), PromptOrigin::Builtin)));
        assert!(prompts.contains(&("custom.extra".to_string(), PromptOrigin::Workspace)));
    }
}
