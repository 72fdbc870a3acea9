//! Command handlers for the LexRAG CLI.

pub mod ask;
pub mod graph;
pub mod prompts;
pub mod sources;

pub use ask::AskCommand;
pub use graph::GraphCommand;
pub use prompts::PromptsCommand;
pub use sources::SourcesCommand;
