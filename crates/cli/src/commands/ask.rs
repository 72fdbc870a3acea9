//! Ask command handler.
//!
//! Runs one question through the verification workflow and prints the answer
//! with its citations. Ctrl-C cancels the run in flight.

use clap::Args;
use lexrag_core::{AppConfig, AppError, AppResult};
use lexrag_workflow::{AnswerRequest, AnswerResponse, AnswerStatus, Orchestrator, RunOptions};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Answer a question with verified citations
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Topic label; the configured secondary topic routes to the remote index
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Failed verifications tolerated before accepting the answer (1-5)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Grade retrieved evidence one item at a time
    #[arg(long)]
    pub no_concurrent_grading: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question_text()?;
        config.validate()?;

        let orchestrator = Orchestrator::from_config(config)?;

        let mut request = AnswerRequest::new(question);
        if let Some(topic) = &self.topic {
            request = request.with_topic(topic.clone());
        }

        let options = RunOptions {
            verbose: config.verbose,
            max_retries: self.max_retries,
            sequential_grading: self.no_concurrent_grading,
        };

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling run");
                on_interrupt.cancel();
            }
        });

        let outcome = orchestrator.run(&request, &options, &cancel).await;
        interrupt.abort();

        let (response, result) = match outcome {
            Ok(response) => (response, Ok(())),
            Err(e) => (AnswerResponse::failure(&e), Err(e)),
        };

        if response.status == AnswerStatus::Unverified {
            tracing::warn!("Answer could not be fully verified");
        }
        if response.degraded {
            tracing::warn!("Answer was produced without citations");
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("{}", render_text(&response));
        }

        result
    }

    fn question_text(&self) -> AppResult<String> {
        let text = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(AppError::Config("No question provided".to_string()));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Config("Question is empty".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Answer text followed by a numbered source list.
fn render_text(response: &AnswerResponse) -> String {
    let mut out = response.answer_text.clone();

    if !response.citations.is_empty() {
        out.push_str("\n\nFuentes:");
        for citation in &response.citations {
            out.push_str(&format!("\n  [{}] {}", citation.index, citation.title));
            if !citation.excerpt.is_empty() {
                out.push_str(&format!("\n      {}", citation.excerpt.replace('\n', " ")));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_workflow::Citation;

    fn command(question: Option<&str>) -> AskCommand {
        AskCommand {
            question: question.map(str::to_string),
            file: None,
            topic: None,
            max_retries: None,
            no_concurrent_grading: false,
            json: false,
        }
    }

    #[test]
    fn test_question_is_trimmed() {
        let cmd = command(Some("  ¿Tarifa del IVA?\n"));
        assert_eq!(cmd.question_text().unwrap(), "¿Tarifa del IVA?");
    }

    #[test]
    fn test_blank_question_rejected() {
        assert!(command(Some("   ")).question_text().is_err());
        assert!(command(None).question_text().is_err());
    }

    #[test]
    fn test_question_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("q.txt");
        std::fs::write(&path, "¿Qué es la renta presuntiva?\n").unwrap();

        let mut cmd = command(None);
        cmd.file = Some(path);
        assert_eq!(cmd.question_text().unwrap(), "¿Qué es la renta presuntiva?");
    }

    #[test]
    fn test_render_lists_citations() {
        let response = AnswerResponse {
            answer_text: "La tarifa general es 19% [1].".to_string(),
            citations: vec![Citation {
                index: 1,
                title: "estatuto.pdf".to_string(),
                excerpt: "Art. 468.\nTarifa general".to_string(),
            }],
            evidence_used: 1,
            used_fallback: false,
            retry_count: 0,
            status: AnswerStatus::Verified,
            degraded: false,
        };

        let text = render_text(&response);
        assert!(text.starts_with("La tarifa general es 19% [1]."));
        assert!(text.contains("[1] estatuto.pdf"));
        assert!(text.contains("Art. 468. Tarifa general"));
    }

    #[test]
    fn test_render_without_citations() {
        let response = AnswerResponse::failure(&AppError::Cancelled);
        assert_eq!(render_text(&response), response.answer_text);
    }
}
