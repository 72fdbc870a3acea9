//! Graph command handler.

use clap::Args;
use lexrag_core::AppResult;

/// Print the workflow as a Mermaid diagram
#[derive(Args, Debug)]
pub struct GraphCommand {}

impl GraphCommand {
    pub fn execute(&self) -> AppResult<()> {
        print!("{}", lexrag_workflow::graph::mermaid());
        Ok(())
    }
}
