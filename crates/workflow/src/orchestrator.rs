//! The orchestrator: drives one run through the state machine.
//!
//! Every external call is bounded by a timeout and raced against the run's
//! cancellation token. What a failure means depends on the stage:
//! classifier and retrieval failures degrade to defaults, grading failures
//! abort the run, generation failures fall through to the plain generator.

use crate::citations::extract_citations;
use crate::generation::{has_structure, AnswerGenerator, CitedGenerator, Generation, PlainGenerator};
use crate::grading::{AnswerGrader, GroundednessGrader, LlmGrader, Relevance, RelevanceGrader};
use crate::prompting::{PromptRunner, PromptSet};
use crate::response::{AnswerResponse, AnswerStatus};
use crate::router::{route_from_classification, LlmQuestionClassifier, RouteDecision, SourceRouter};
use crate::state::{transition, AnswerRequest, Event, RunOptions, RunState, Stage, Verification};
use futures::{stream, StreamExt, TryStreamExt};
use lexrag_core::{AppConfig, AppError, AppResult, WorkflowConfig};
use lexrag_llm::create_client;
use lexrag_retrieval::{
    Evidence, EvidenceSet, EvidenceSource, Origin, SourceHit, SourceRegistry, SourceSelector,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// INFO when the run is verbose, DEBUG otherwise.
macro_rules! detail {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Shared, read-only collaborators of every run.
#[derive(Clone)]
pub struct Collaborators {
    pub router: SourceRouter,
    pub sources: SourceRegistry,
    pub relevance: Arc<dyn RelevanceGrader>,
    pub groundedness: Arc<dyn GroundednessGrader>,
    pub answer_grader: Arc<dyn AnswerGrader>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub fallback_generator: Arc<dyn AnswerGenerator>,
}

pub struct Orchestrator {
    parts: Collaborators,
    policy: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(parts: Collaborators, policy: WorkflowConfig) -> Self {
        Self { parts, policy }
    }

    /// Wire LLM-backed collaborators and configured sources.
    ///
    /// The generation model answers; the grader model routes and grades.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.workflow.validate()?;

        let prompts = Arc::new(PromptSet::load(&config.workspace)?);
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(
            &config.provider,
            config.provider_endpoint(&config.provider),
            api_key.as_deref(),
            Some(config.workflow.generation_timeout()),
        )?;

        let generation_runner = PromptRunner::new(client.clone(), &config.model, prompts.clone());
        let grading_runner = PromptRunner::new(client, config.grader_model(), prompts);
        let grader = Arc::new(LlmGrader::new(grading_runner.clone()));

        info!(
            "Using {} (generation: {}, grading: {})",
            config.provider,
            generation_runner.model(),
            grading_runner.model()
        );

        let parts = Collaborators {
            router: SourceRouter::new(
                Arc::new(LlmQuestionClassifier::new(grading_runner)),
                config.workflow.secondary_topic.clone(),
            ),
            sources: SourceRegistry::from_config(&config.sources, &config.workspace)?,
            relevance: grader.clone(),
            groundedness: grader.clone(),
            answer_grader: grader,
            generator: Arc::new(CitedGenerator::new(generation_runner.clone())),
            fallback_generator: Arc::new(PlainGenerator::new(generation_runner)),
        };

        Ok(Self::new(parts, config.workflow.clone()))
    }

    pub fn policy(&self) -> &WorkflowConfig {
        &self.policy
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.parts.sources
    }

    /// Answer a question. Never fails: hard errors become a failure response.
    pub async fn answer(
        &self,
        request: &AnswerRequest,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> AnswerResponse {
        match self.run(request, options, cancel).await {
            Ok(response) => response,
            Err(e) => {
                error!("Run failed: {}", e);
                AnswerResponse::failure(&e)
            }
        }
    }

    /// Answer a question, surfacing hard failures as errors.
    pub async fn run(
        &self,
        request: &AnswerRequest,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            run_id = %run_id,
            topic = request.topic.as_deref().unwrap_or("-")
        );

        self.execute(request.clone(), options, cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        request: AnswerRequest,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        let max_retries = options.max_retries.unwrap_or(self.policy.max_retries);
        if !(1..=5).contains(&max_retries) {
            return Err(AppError::Config(format!(
                "max retries must be between 1 and 5, got {}",
                max_retries
            )));
        }

        info!("Answering: {}", request.question);
        let mut state = RunState::new(request);
        let mut stage = Stage::Route;

        loop {
            let question = state.request.question.clone();

            let event = match stage {
                Stage::Done(verification) => return finish(state, verification),

                Stage::Route => {
                    let decision = self.route(&state.request, cancel).await?;
                    info!(route = %decision, "Routed question");
                    state.route = Some(decision);
                    Event::Routed(decision)
                }

                Stage::Retrieve(selector) => {
                    let hits = self.retrieve(selector, &question, cancel).await?;
                    state.evidence = EvidenceSet::from_hits(hits, selector.origin());
                    info!(
                        source = selector.as_str(),
                        "Retrieved {} evidence item(s)",
                        state.evidence.len()
                    );
                    Event::Retrieved
                }

                Stage::GradeEvidence => {
                    let needs_fallback = self
                        .grade_evidence(&mut state.evidence, &question, options, cancel)
                        .await?;
                    info!(
                        kept = state.evidence.len(),
                        discarded = state.evidence.discarded(),
                        needs_fallback,
                        "Graded evidence"
                    );
                    Event::EvidenceGraded { needs_fallback }
                }

                Stage::WebSearch => {
                    let hits = self.web_search(&question, cancel).await?;
                    let added = hits.len();
                    state.evidence.append(
                        hits.into_iter()
                            .map(|hit| Evidence::from_hit(hit, Origin::WebFallback))
                            .collect(),
                    );
                    info!(
                        "Web fallback added {} item(s); evidence now {}",
                        added,
                        state.evidence.len()
                    );
                    Event::FallbackAppended
                }

                Stage::Generate => {
                    let generation = self.generate(&question, &state.evidence, cancel).await?;
                    state.generations += 1;
                    detail!(
                        options.verbose,
                        generation = state.generations,
                        degraded = generation.degraded,
                        citations = generation.citations.len(),
                        "Generated answer"
                    );
                    state.generation = Some(generation);
                    Event::Generated
                }

                Stage::CheckGroundedness => {
                    let answer = current_answer(&state)?;
                    let verdict = guarded(
                        cancel,
                        self.policy.grading_timeout(),
                        "groundedness grading",
                        self.parts.groundedness.grade_grounded(&state.evidence, &answer),
                    )
                    .await?;
                    info!(verdict = ?verdict, "Groundedness check");
                    Event::GroundednessGraded(verdict)
                }

                Stage::CheckAnswer => {
                    let answer = current_answer(&state)?;
                    let verdict = guarded(
                        cancel,
                        self.policy.grading_timeout(),
                        "answer grading",
                        self.parts.answer_grader.grade_addresses(&question, &answer),
                    )
                    .await?;
                    info!(verdict = ?verdict, "Answer relevance check");
                    Event::AnswerGraded(verdict)
                }
            };

            let (next, progress) = transition(stage, event, state.progress(), max_retries)?;
            if progress.retry_count > state.retry_count {
                info!(
                    "Verification failed ({}/{} retries used)",
                    progress.retry_count, max_retries
                );
            }
            state.apply(progress);
            debug!(from = %stage, to = %next, "Stage transition");
            stage = next;
        }
    }

    async fn route(
        &self,
        request: &AnswerRequest,
        cancel: &CancellationToken,
    ) -> AppResult<RouteDecision> {
        if let Some(decision) = self.parts.router.route_by_topic(request.topic.as_deref()) {
            debug!("Topic selects the secondary index");
            return Ok(decision);
        }

        let classification = guarded(
            cancel,
            self.policy.classifier_timeout(),
            "question classification",
            self.parts.router.classifier().classify(&request.question),
        )
        .await;

        if let Err(AppError::Cancelled) = classification {
            return Err(AppError::Cancelled);
        }
        Ok(route_from_classification(classification))
    }

    async fn retrieve(
        &self,
        selector: SourceSelector,
        question: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<SourceHit>> {
        self.search(self.parts.sources.index(selector), selector.as_str(), question, cancel)
            .await
    }

    async fn web_search(&self, question: &str, cancel: &CancellationToken) -> AppResult<Vec<SourceHit>> {
        self.search(self.parts.sources.web(), "web", question, cancel)
            .await
    }

    /// One source query. Anything but cancellation yields no hits.
    async fn search(
        &self,
        source: Option<Arc<dyn EvidenceSource>>,
        role: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<SourceHit>> {
        let Some(source) = source else {
            warn!("No {} source configured; continuing without its evidence", role);
            return Ok(Vec::new());
        };

        match guarded(
            cancel,
            self.policy.retrieval_timeout(),
            "retrieval",
            source.search(question),
        )
        .await
        {
            Ok(hits) => Ok(hits),
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => {
                warn!(
                    backend = source.name(),
                    "{} retrieval failed, continuing without evidence: {}", role, e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Drop irrelevant items; report whether any were dropped.
    async fn grade_evidence(
        &self,
        evidence: &mut EvidenceSet,
        question: &str,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> AppResult<bool> {
        if evidence.is_empty() {
            return Ok(true);
        }

        let concurrency = if options.sequential_grading {
            1
        } else {
            self.policy.grading_concurrency.max(1)
        };
        let limit = self.policy.grading_timeout();
        let grader = &self.parts.relevance;

        let verdicts: Vec<Relevance> = stream::iter(evidence.iter())
            .map(|item| guarded(cancel, limit, "relevance grading", grader.grade(item, question)))
            .buffered(concurrency)
            .try_collect()
            .await?;

        for (item, verdict) in evidence.iter().zip(&verdicts) {
            detail!(options.verbose, source = %item.source_id, verdict = ?verdict, "Relevance");
        }

        let keep: Vec<bool> = verdicts
            .iter()
            .map(|v| *v == Relevance::Relevant)
            .collect();
        let needs_fallback = keep.iter().any(|relevant| !relevant);
        evidence.retain_relevant(&keep);

        Ok(needs_fallback)
    }

    /// Cited generation, then the plain generator, then a hard failure.
    async fn generate(
        &self,
        question: &str,
        evidence: &EvidenceSet,
        cancel: &CancellationToken,
    ) -> AppResult<Generation> {
        let limit = self.policy.generation_timeout();
        let sections = &self.policy.required_sections;

        let primary_error = match guarded(
            cancel,
            limit,
            "generation",
            self.parts.generator.generate(question, evidence),
        )
        .await
        {
            Ok(text) => {
                let structured = has_structure(&text, sections);
                if structured {
                    debug!("Answer contains every required section");
                } else {
                    warn!("Answer is missing required sections: {}", sections.join(", "));
                }
                let citations = extract_citations(&text, evidence, self.policy.excerpt_chars);
                return Ok(Generation {
                    text,
                    citations,
                    degraded: false,
                    has_structure: structured,
                });
            }
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => e,
        };

        warn!(
            "{} generator failed, falling back to {}: {}",
            self.parts.generator.name(),
            self.parts.fallback_generator.name(),
            primary_error
        );

        match guarded(
            cancel,
            limit,
            "fallback generation",
            self.parts.fallback_generator.generate(question, evidence),
        )
        .await
        {
            Ok(text) => Ok(Generation {
                has_structure: has_structure(&text, sections),
                text,
                citations: Vec::new(),
                degraded: true,
            }),
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => Err(AppError::Generation(format!(
                "cited generator: {}; plain generator: {}",
                primary_error, e
            ))),
        }
    }
}

/// Bound `fut` by `limit` and abandon it when the run is cancelled.
async fn guarded<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = tokio::time::timeout(limit, fut) => {
            result.unwrap_or_else(|_| Err(AppError::Timeout { operation, after: limit }))
        }
    }
}

fn current_answer(state: &RunState) -> AppResult<String> {
    state
        .generation
        .as_ref()
        .map(|g| g.text.clone())
        .ok_or_else(|| AppError::Other("Answer check reached without a generation".to_string()))
}

fn finish(state: RunState, verification: Verification) -> AppResult<AnswerResponse> {
    let degraded = state.degraded();
    let generation = state
        .generation
        .ok_or_else(|| AppError::Other("Run finished without a generation".to_string()))?;

    let status = match verification {
        Verification::Verified => AnswerStatus::Verified,
        Verification::Unverified => AnswerStatus::Unverified,
    };

    info!(
        status = status.as_str(),
        degraded,
        retries = state.retry_count,
        used_fallback = state.used_fallback,
        generations = state.generations,
        "Run finished"
    );

    Ok(AnswerResponse {
        answer_text: generation.text,
        citations: generation.citations,
        evidence_used: state.evidence.len(),
        used_fallback: state.used_fallback,
        retry_count: state.retry_count,
        status,
        degraded,
    })
}
