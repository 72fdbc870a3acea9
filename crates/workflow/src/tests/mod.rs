//! Orchestrator tests with scripted collaborators.


use crate::generation::AnswerGenerator;
use crate::grading::{
    AnswerFit, AnswerGrader, Groundedness, GroundednessGrader, Relevance, RelevanceGrader,
};
use crate::orchestrator::{Collaborators, Orchestrator};
use crate::router::{Datasource, QuestionClassifier, SourceRouter};
use lexrag_core::{AppError, AppResult, WorkflowConfig};
use lexrag_retrieval::{Evidence, EvidenceSet, EvidenceSource, SourceHit, SourceRegistry};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replies popped in order; `fallback` once the script runs out.
pub(crate) struct Script<T: Clone> {
    queue: Mutex<VecDeque<AppResult<T>>>,
    fallback: T,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    pub(crate) fn new(fallback: T) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, reply: AppResult<T>) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> AppResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub(crate) struct FakeClassifier {
    pub(crate) script: Script<Datasource>,
}

#[async_trait::async_trait]
impl QuestionClassifier for FakeClassifier {
    async fn classify(&self, _question: &str) -> AppResult<Datasource> {
        self.script.next()
    }
}

/// Evidence source that counts queries.
pub(crate) struct FakeSource {
    hits: Vec<SourceHit>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(prefix: &str, contents: &[&str]) -> Self {
        Self {
            hits: contents
                .iter()
                .enumerate()
                .map(|(i, content)| SourceHit::new(*content, format!("{}-{}.pdf", prefix, i + 1)))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EvidenceSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn search(&self, _query: &str) -> AppResult<Vec<SourceHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Retrieval("index unreachable".to_string()));
        }
        Ok(self.hits.clone())
    }
}

/// Marks evidence irrelevant when its content contains "IRRELEVANTE".
pub(crate) struct FakeRelevance {
    pub(crate) calls: AtomicUsize,
    pub(crate) fail: bool,
    pub(crate) delay: Option<Duration>,
}

#[async_trait::async_trait]
impl RelevanceGrader for FakeRelevance {
    async fn grade(&self, evidence: &Evidence, _question: &str) -> AppResult<Relevance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AppError::Grading("grader offline".to_string()));
        }
        Ok(if evidence.content.contains("IRRELEVANTE") {
            Relevance::Irrelevant
        } else {
            Relevance::Relevant
        })
    }
}

pub(crate) struct FakeGroundedness {
    pub(crate) script: Script<Groundedness>,
    /// Evidence size seen by each call
    pub(crate) seen: Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl GroundednessGrader for FakeGroundedness {
    async fn grade_grounded(&self, evidence: &EvidenceSet, _answer: &str) -> AppResult<Groundedness> {
        self.seen.lock().unwrap().push(evidence.len());
        self.script.next()
    }
}

pub(crate) struct FakeAnswerGrader {
    pub(crate) script: Script<AnswerFit>,
}

#[async_trait::async_trait]
impl AnswerGrader for FakeAnswerGrader {
    async fn grade_addresses(&self, _question: &str, _answer: &str) -> AppResult<AnswerFit> {
        self.script.next()
    }
}

pub(crate) struct FakeGenerator {
    pub(crate) label: &'static str,
    pub(crate) script: Script<String>,
    /// Evidence size seen by each call
    pub(crate) seen: Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl AnswerGenerator for FakeGenerator {
    fn name(&self) -> &str {
        self.label
    }

    async fn generate(&self, _question: &str, evidence: &EvidenceSet) -> AppResult<String> {
        self.seen.lock().unwrap().push(evidence.len());
        self.script.next()
    }
}

pub(crate) const STRUCTURED_ANSWER: &str =
    "1. REFERENCIA\nTarifa del IVA.\n2. CONTENIDO\nLa tarifa general es 19% [1].\n5. ANÁLISIS\nVer Art. 468 [2].";

/// Every collaborator of an orchestrator, individually scriptable.
pub(crate) struct Harness {
    pub(crate) classifier: Arc<FakeClassifier>,
    pub(crate) primary: Arc<FakeSource>,
    pub(crate) secondary: Option<Arc<FakeSource>>,
    pub(crate) web: Arc<FakeSource>,
    pub(crate) relevance: Arc<FakeRelevance>,
    pub(crate) groundedness: Arc<FakeGroundedness>,
    pub(crate) answer: Arc<FakeAnswerGrader>,
    pub(crate) generator: Arc<FakeGenerator>,
    pub(crate) fallback_generator: Arc<FakeGenerator>,
    pub(crate) policy: WorkflowConfig,
}

impl Harness {
    /// Everything passes: three relevant primary documents, grounded,
    /// addressing answers.
    pub(crate) fn new() -> Self {
        Self {
            classifier: Arc::new(FakeClassifier {
                script: Script::new(Datasource::NeedsDocumentRetrieval),
            }),
            primary: Arc::new(FakeSource::new(
                "primary",
                &["Art. 468 ET", "Concepto DIAN 001", "Sentencia CE 2020"],
            )),
            secondary: Some(Arc::new(FakeSource::new(
                "secondary",
                &["Renta líquida", "Deducciones"],
            ))),
            web: Arc::new(FakeSource::new("web", &["Noticia DIAN"])),
            relevance: Arc::new(FakeRelevance {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: None,
            }),
            groundedness: Arc::new(FakeGroundedness {
                script: Script::new(Groundedness::Grounded),
                seen: Mutex::new(Vec::new()),
            }),
            answer: Arc::new(FakeAnswerGrader {
                script: Script::new(AnswerFit::Addresses),
            }),
            generator: Arc::new(FakeGenerator {
                label: "cited",
                script: Script::new(STRUCTURED_ANSWER.to_string()),
                seen: Mutex::new(Vec::new()),
            }),
            fallback_generator: Arc::new(FakeGenerator {
                label: "plain",
                script: Script::new("Respuesta simple sin citas.".to_string()),
                seen: Mutex::new(Vec::new()),
            }),
            policy: WorkflowConfig::default(),
        }
    }

    pub(crate) fn with_primary(mut self, contents: &[&str]) -> Self {
        self.primary = Arc::new(FakeSource::new("primary", contents));
        self
    }

    pub(crate) fn with_relevance(mut self, relevance: FakeRelevance) -> Self {
        self.relevance = Arc::new(relevance);
        self
    }

    pub(crate) fn orchestrator(&self) -> Orchestrator {
        let primary: Arc<dyn EvidenceSource> = self.primary.clone();
        let secondary: Option<Arc<dyn EvidenceSource>> = self
            .secondary
            .clone()
            .map(|s| s as Arc<dyn EvidenceSource>);
        let web: Arc<dyn EvidenceSource> = self.web.clone();

        let parts = Collaborators {
            router: SourceRouter::new(self.classifier.clone(), self.policy.secondary_topic.clone()),
            sources: SourceRegistry::new(Some(primary), secondary, Some(web)),
            relevance: self.relevance.clone(),
            groundedness: self.groundedness.clone(),
            answer_grader: self.answer.clone(),
            generator: self.generator.clone(),
            fallback_generator: self.fallback_generator.clone(),
        };

        Orchestrator::new(parts, self.policy.clone())
    }
}
