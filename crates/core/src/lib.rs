//! LexRAG Core Library
//!
//! This crate provides the foundational utilities shared by every LexRAG crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (providers, evidence sources, workflow policy)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, SourcesConfig, WorkflowConfig};
pub use error::{AppError, AppResult};
