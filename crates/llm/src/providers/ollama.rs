//! Ollama chat provider.
//!
//! Uses the non-streaming `/api/chat` endpoint:
//! https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-chat-completion

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, Message};
use crate::types::{ProviderType, ResponseFormat};
use lexrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatReply,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Client for a local (or LAN) Ollama runtime.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for http://localhost:11434.
    pub fn new() -> Self {
        Self::with_base_url(ProviderType::Ollama.default_endpoint())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Give up on HTTP requests after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: request.messages(),
            format: match request.format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    fn convert_response(&self, response: ChatResponse) -> LlmResponse {
        LlmResponse {
            content: response.message.content,
            model: response.model,
            usage: LlmUsage::new(response.prompt_eval_count, response.eval_count),
            truncated: response.done_reason.as_deref() == Some("length"),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        ProviderType::Ollama.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, format = ?request.format, "Ollama chat request");

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Ollama unreachable at {}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("Ollama returned {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Unreadable Ollama response: {}", e)))?;

        Ok(self.convert_response(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/");
        assert_eq!(client.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_chat_request_body() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("¿Documento relevante?", "llama3.2")
            .with_system("Eres un calificador")
            .with_temperature(0.0)
            .with_max_tokens(100)
            .with_json_output();

        let body = serde_json::to_value(client.to_chat_request(&request)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "¿Documento relevante?");
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 100);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_text_request_omits_format() {
        let client = OllamaClient::new();
        let body = serde_json::to_value(client.to_chat_request(&LlmRequest::new("q", "m"))).unwrap();
        assert!(body.get("format").is_none());
        assert!(body["options"].get("temperature").is_none());
    }

    #[test]
    fn test_response_conversion() {
        let client = OllamaClient::new();
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"binary_score\":\"yes\"}"},"done":true,"done_reason":"stop","prompt_eval_count":12,"eval_count":5}"#,
        )
        .unwrap();

        let response = client.convert_response(raw);
        assert_eq!(response.content, r#"{"binary_score":"yes"}"#);
        assert_eq!(response.usage.total(), 17);
        assert!(!response.truncated);
    }

    #[test]
    fn test_length_stop_is_truncated() {
        let client = OllamaClient::new();
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"content":"1. REFERENCIA"},"done_reason":"length"}"#,
        )
        .unwrap();
        assert!(client.convert_response(raw).truncated);
    }
}
