//! Builds the configured `LlmClient`.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use lexrag_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create the client for `provider`.
///
/// `endpoint` replaces the provider's default base URL. `timeout` bounds each
/// HTTP request; the workflow applies its own, usually shorter, per-stage
/// deadlines on top. OpenAI requires `api_key`; Ollama ignores it.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown provider: {} (expected one of: {})",
            provider,
            ProviderType::ALL.map(|p| p.as_str()).join(", ")
        ))
    })?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
    tracing::debug!(provider = provider_type.as_str(), base_url, "Creating LLM client");

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => {
            let mut client = OllamaClient::with_base_url(base_url);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Arc::new(client)
        }
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(
                    "OpenAI provider requires an API key (set LEXRAG_API_KEY or OPENAI_API_KEY)"
                        .to_string(),
                )
            })?;
            let mut client = OpenAiClient::with_base_url(base_url, api_key);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Arc::new(client)
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_with_timeout_and_endpoint() {
        let client = create_client(
            "ollama",
            Some("http://gpu-box:11434"),
            None,
            Some(Duration::from_secs(5)),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("API key")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("OpenAI", None, Some("sk-test"), None).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_unknown_provider_lists_known_ones() {
        match create_client("anthropic", None, None, None) {
            Err(e) => {
                let msg = e.to_string();
                assert!(msg.contains("Unknown provider: anthropic"));
                assert!(msg.contains("openai, ollama"));
            }
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
