//! Prompt system for LexRAG.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in defaults for every workflow prompt
//! - Workspace overrides in `.lexrag/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_builtin, load_prompt};
pub use types::{
    ids, BuiltPrompt, BuiltPromptMetadata, OutputFormat, PromptDefinition, PromptInputSpec,
    PromptOrigin, PromptOutputSpec,
};
