//! LLM integration crate for LexRAG.
//!
//! This crate provides a provider-agnostic abstraction over the language
//! models that route questions, grade evidence and answers, and generate
//! cited responses.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat Completions API (and compatible gateways)
//! - **Mock**: Scripted responses for tests
//!
//! # Example
//! ```no_run
//! use lexrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("¿Cuál es la tarifa general del IVA?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, Message, Role};
pub use factory::create_client;
pub use providers::{MockLlmClient, OllamaClient, OpenAiClient};
pub use types::{ProviderType, ResponseFormat};
