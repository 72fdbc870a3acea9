//! Adaptive retrieval-and-verification workflow for LexRAG.
//!
//! A question is routed to one evidence source, the retrieved evidence is
//! graded, the web is searched when evidence is insufficient, and a cited
//! answer is generated and checked for groundedness and relevance before it
//! is returned. Failed checks loop back a bounded number of times.

pub mod citations;
pub mod generation;
pub mod grading;
pub mod graph;
pub mod orchestrator;
pub mod prompting;
pub mod response;
pub mod router;
pub mod state;

#[cfg(test)]
mod tests;

pub use citations::{extract_citations, Citation};
pub use generation::{AnswerGenerator, CitedGenerator, Generation, PlainGenerator};
pub use grading::{
    AnswerFit, AnswerGrader, Groundedness, GroundednessGrader, LlmGrader, Relevance,
    RelevanceGrader,
};
pub use orchestrator::{Collaborators, Orchestrator};
pub use prompting::{PromptRunner, PromptSet};
pub use response::{AnswerResponse, AnswerStatus};
pub use router::{Datasource, LlmQuestionClassifier, QuestionClassifier, RouteDecision, SourceRouter};
pub use state::{AnswerRequest, RunOptions, RunState, Stage, Verification};
