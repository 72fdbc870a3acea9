//! Scripted LLM client for tests.
//!
//! Replays a fixed list of responses in order and records every request it
//! receives, so callers can assert on prompts without a running model.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use lexrag_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Failure(String),
}

/// Mock client that replays scripted replies.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Create a client that answers with `replies`, in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| MockReply::Content(r.into()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(MockReply::Failure(message.into()));
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| AppError::Llm("Mock client lock poisoned".to_string()))?
            .pop_front();

        match reply {
            Some(MockReply::Content(content)) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
                truncated: false,
            }),
            Some(MockReply::Failure(message)) => Err(AppError::Llm(message)),
            None => Err(AppError::Llm("Mock client has no scripted reply left".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let client = MockLlmClient::new(["first", "second"]);
        let request = LlmRequest::new("q", "m");

        assert_eq!(client.complete(&request).await.unwrap().content, "first");
        assert_eq!(client.complete(&request).await.unwrap().content, "second");
        assert!(client.complete(&request).await.is_err());
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let client = MockLlmClient::default();
        client.push_failure("connection refused");

        let err = client
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
