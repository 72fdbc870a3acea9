//! LexRAG CLI
//!
//! Command-line front-end for cited Colombian legal and tax answers.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, GraphCommand, PromptsCommand, SourcesCommand};
use lexrag_core::logging::{self, LogFormat};
use lexrag_core::{AppConfig, AppResult};
use std::path::PathBuf;

/// LexRAG - verified, cited answers over legal and tax sources
#[derive(Parser, Debug)]
#[command(name = "lexrag")]
#[command(about = "Verified, cited answers over legal and tax sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEXRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEXRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (debug logging, per-item grading detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "LEXRAG_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "LEXRAG_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question with verified citations
    Ask(AskCommand),

    /// Show the configured evidence sources
    Sources(SourcesCommand),

    /// Print the workflow as a Mermaid diagram
    Graph(GraphCommand),

    /// List prompt ids and where each is loaded from
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;

    // A config file given on the command line is merged before the other flags
    if let Some(path) = &cli.config {
        config = config.merge_yaml(path)?;
    }

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let format = LogFormat::parse(&config.log_format).unwrap_or_default();
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("LexRAG CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_lexrag_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Sources(_) => "sources",
        Commands::Graph(_) => "graph",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Sources(cmd) => cmd.execute(&config),
        Commands::Graph(cmd) => cmd.execute(),
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
