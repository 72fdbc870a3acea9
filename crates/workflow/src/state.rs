//! Run state and the answering state machine.
//!
//! The topology is fixed, so it is spelled out as a `Stage` enum and one pure
//! [`transition`] function rather than a generic graph runtime. The
//! orchestrator performs the side effect for the current stage, turns the
//! outcome into an [`Event`] and asks `transition` where to go next.

use crate::generation::Generation;
use crate::grading::{AnswerFit, Groundedness};
use crate::router::RouteDecision;
use lexrag_core::{AppError, AppResult};
use lexrag_retrieval::{EvidenceSet, SourceSelector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inbound question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question: String,
    /// Topic tag; the secondary label forces the secondary index
    #[serde(default)]
    pub topic: Option<String>,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Per-run knobs supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log evidence and verdicts at INFO instead of DEBUG
    pub verbose: bool,
    /// Overrides the configured retry bound
    pub max_retries: Option<u32>,
    /// Grade evidence one item at a time
    pub sequential_grading: bool,
}

/// How an accepted answer left the verification loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Verified,
    Unverified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Route,
    Retrieve(SourceSelector),
    GradeEvidence,
    WebSearch,
    Generate,
    CheckGroundedness,
    CheckAnswer,
    Done(Verification),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Route => "route",
            Stage::Retrieve(_) => "retrieve",
            Stage::GradeEvidence => "grade_evidence",
            Stage::WebSearch => "web_search",
            Stage::Generate => "generate",
            Stage::CheckGroundedness => "check_groundedness",
            Stage::CheckAnswer => "check_answer",
            Stage::Done(_) => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Retrieve(selector) => write!(f, "retrieve({})", selector.as_str()),
            Stage::Done(Verification::Verified) => write!(f, "done(verified)"),
            Stage::Done(Verification::Unverified) => write!(f, "done(unverified)"),
            other => f.write_str(other.name()),
        }
    }
}

/// Outcome of the work done in a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Routed(RouteDecision),
    Retrieved,
    EvidenceGraded { needs_fallback: bool },
    FallbackAppended,
    Generated,
    GroundednessGraded(Groundedness),
    AnswerGraded(AnswerFit),
}

/// Counters the transition function reads and updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub retry_count: u32,
    pub used_fallback: bool,
}

/// Next stage for `event` observed in `stage`.
///
/// Every failed post-generation check bumps `retry_count`; reaching
/// `max_retries` ends the run with the latest answer unverified.
pub fn transition(
    stage: Stage,
    event: Event,
    progress: Progress,
    max_retries: u32,
) -> AppResult<(Stage, Progress)> {
    let next = match (stage, event) {
        (Stage::Route, Event::Routed(RouteDecision::Retrieve(selector))) => {
            (Stage::Retrieve(selector), progress)
        }
        (Stage::Route, Event::Routed(RouteDecision::WebSearch)) => (Stage::WebSearch, progress),

        (Stage::Retrieve(_), Event::Retrieved) => (Stage::GradeEvidence, progress),

        (Stage::GradeEvidence, Event::EvidenceGraded { needs_fallback: true }) => {
            (Stage::WebSearch, progress)
        }
        (Stage::GradeEvidence, Event::EvidenceGraded { needs_fallback: false }) => {
            (Stage::Generate, progress)
        }

        (Stage::WebSearch, Event::FallbackAppended) => (
            Stage::Generate,
            Progress {
                used_fallback: true,
                ..progress
            },
        ),

        (Stage::Generate, Event::Generated) => (Stage::CheckGroundedness, progress),

        (Stage::CheckGroundedness, Event::GroundednessGraded(Groundedness::Grounded)) => {
            (Stage::CheckAnswer, progress)
        }
        (Stage::CheckGroundedness, Event::GroundednessGraded(Groundedness::Ungrounded)) => {
            retry_or_stop(progress, max_retries, Stage::Generate)
        }

        (Stage::CheckAnswer, Event::AnswerGraded(AnswerFit::Addresses)) => {
            (Stage::Done(Verification::Verified), progress)
        }
        (Stage::CheckAnswer, Event::AnswerGraded(AnswerFit::MissesTheMark)) => {
            // The web is searched at most once per run
            let retry_stage = if progress.used_fallback {
                Stage::Generate
            } else {
                Stage::WebSearch
            };
            retry_or_stop(progress, max_retries, retry_stage)
        }

        (stage, event) => {
            return Err(AppError::Other(format!(
                "No transition from {} on {:?}",
                stage, event
            )))
        }
    };

    Ok(next)
}

fn retry_or_stop(progress: Progress, max_retries: u32, retry_stage: Stage) -> (Stage, Progress) {
    let progress = Progress {
        retry_count: progress.retry_count + 1,
        ..progress
    };

    if progress.retry_count >= max_retries {
        (Stage::Done(Verification::Unverified), progress)
    } else {
        (retry_stage, progress)
    }
}

/// Everything one run knows. Owned by that run only.
#[derive(Debug, Clone)]
pub struct RunState {
    pub request: AnswerRequest,
    pub route: Option<RouteDecision>,
    pub evidence: EvidenceSet,
    pub generation: Option<Generation>,
    pub used_fallback: bool,
    pub retry_count: u32,
    /// Number of generator invocations that produced an answer
    pub generations: u32,
}

impl RunState {
    pub fn new(request: AnswerRequest) -> Self {
        Self {
            request,
            route: None,
            evidence: EvidenceSet::default(),
            generation: None,
            used_fallback: false,
            retry_count: 0,
            generations: 0,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            retry_count: self.retry_count,
            used_fallback: self.used_fallback,
        }
    }

    pub fn apply(&mut self, progress: Progress) {
        self.retry_count = progress.retry_count;
        self.used_fallback = progress.used_fallback;
    }

    /// Whether the latest generation came from the fallback generator.
    pub fn degraded(&self) -> bool {
        self.generation.as_ref().map(|g| g.degraded).unwrap_or(false)
    }
}
