//! Prompts command handler.

use clap::Args;
use lexrag_core::{AppConfig, AppResult};
use lexrag_prompt::{list_prompts, PromptOrigin};

/// List prompt ids and where each is loaded from
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            let output: Vec<serde_json::Value> = prompts
                .iter()
                .map(|(id, origin)| serde_json::json!({ "id": id, "origin": origin }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        for (id, origin) in &prompts {
            let origin = match origin {
                PromptOrigin::Builtin => "built-in",
                PromptOrigin::Workspace => "workspace override",
            };
            println!("{:<22} {}", id, origin);
        }

        Ok(())
    }
}
