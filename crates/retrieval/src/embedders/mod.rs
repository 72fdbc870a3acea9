//! Query embedding services.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

use lexrag_core::config::EmbeddingServiceConfig;
use lexrag_core::{AppError, AppResult};
use std::sync::Arc;

/// Turns a query into a vector for similarity search.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "ollama", "openai")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Embed one text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedder for `model` using the configured embedding service.
pub fn create_embedder(
    config: &EmbeddingServiceConfig,
    model: &str,
) -> AppResult<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => {
            let endpoint = config
                .endpoint
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaEmbedder::new(endpoint, model)?))
        }

        "openai" => {
            let env_name = config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let api_key = std::env::var(env_name).map_err(|_| {
                AppError::Config(format!(
                    "OpenAI embeddings require an API key in ${}",
                    env_name
                ))
            })?;
            let endpoint = config
                .endpoint
                .as_deref()
                .unwrap_or(openai::DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiEmbedder::new(endpoint, api_key, model)?))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, openai",
            other
        ))),
    }
}
