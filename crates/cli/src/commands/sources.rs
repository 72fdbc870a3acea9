//! Sources command handler.

use clap::Args;
use lexrag_core::{AppConfig, AppResult};
use lexrag_retrieval::{SourceDescription, SourceRegistry};

/// Show the configured evidence sources
#[derive(Args, Debug)]
pub struct SourcesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SourcesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sources command");

        let registry = SourceRegistry::from_config(&config.sources, &config.workspace)?;
        let described = registry.describe();

        if self.json {
            let output: Vec<serde_json::Value> = described
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "role": d.role,
                        "backend": d.backend,
                        "location": d.location,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for line in described.iter().map(format_line) {
                println!("{}", line);
            }
        }

        Ok(())
    }
}

fn format_line(source: &SourceDescription) -> String {
    match (&source.backend, &source.location) {
        (Some(backend), Some(location)) => {
            format!("{:<10} {:<8} {}", source.role, backend, location)
        }
        _ => format!("{:<10} (not configured)", source.role),
    }
}
