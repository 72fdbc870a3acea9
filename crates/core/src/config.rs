//! Configuration management for LexRAG.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.lexrag/config.yaml`)
//! - Environment variables (`LEXRAG_*`)
//! - Command-line flags
//!
//! The configuration is workspace-centric, with local state stored in `.lexrag/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Providers with a working `LlmClient` implementation.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lexrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider ("openai" or "ollama")
    pub provider: String,

    /// Model used for answer generation
    pub model: String,

    /// Model used by the router and graders (defaults to `model`)
    pub grader_model: Option<String>,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging and per-stage detail)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Evidence source backends
    pub sources: SourcesConfig,

    /// Orchestrator policy
    pub workflow: WorkflowConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "graderModel", default)]
    pub grader_model: Option<String>,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Completion model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Evidence source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesConfig {
    /// Local semantic index (primary source)
    #[serde(default)]
    pub local: LocalIndexConfig,

    /// Remote vector index (secondary source, selected by topic)
    #[serde(default)]
    pub remote: RemoteIndexConfig,

    /// General web search (fallback source)
    #[serde(default)]
    pub web: WebSearchConfig,

    /// Query embedding service shared by both indexes
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,
}

/// Local semantic index (Chroma-compatible HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIndexConfig {
    pub endpoint: String,
    pub collection: String,
    pub top_k: usize,
    pub embedding_model: String,
    /// JSON file of pre-retrieved hits; replaces the HTTP backend when set
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl Default for LocalIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            collection: "legal-docs-chroma".to_string(),
            top_k: 4,
            embedding_model: "nomic-embed-text".to_string(),
            fixture: None,
        }
    }
}

/// Remote vector index (Pinecone-compatible HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIndexConfig {
    /// Index host URL; the remote source is unavailable when unset
    #[serde(default)]
    pub host: Option<String>,
    pub namespace: String,
    pub api_key_env: String,
    pub top_k: usize,
    pub embedding_model: String,
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl Default for RemoteIndexConfig {
    fn default() -> Self {
        Self {
            host: None,
            namespace: "renta".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            top_k: 5,
            embedding_model: "text-embedding-3-large".to_string(),
            fixture: None,
        }
    }
}

/// Web search fallback (Tavily-compatible HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub max_results: usize,
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 3,
            fixture: None,
        }
    }
}

/// Embedding service used to vectorize queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingServiceConfig {
    /// "ollama" or "openai"
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

/// Orchestrator policy: routing label, retry bound, timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowConfig {
    /// Topic label that forces the secondary (remote) index
    pub secondary_topic: String,

    /// Failed verifications tolerated before accepting an unverified answer
    pub max_retries: u32,

    /// Character budget for citation excerpts
    pub excerpt_chars: usize,

    /// Evidence items graded in parallel (1 = sequential)
    pub grading_concurrency: usize,

    /// Headings a well-formed cited answer is expected to contain
    pub required_sections: Vec<String>,

    pub classifier_timeout: u64,
    pub retrieval_timeout: u64,
    pub grading_timeout: u64,
    pub generation_timeout: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            secondary_topic: "Renta".to_string(),
            max_retries: 2,
            excerpt_chars: 200,
            grading_concurrency: 4,
            required_sections: vec!["REFERENCIA".to_string(), "ANÁLISIS".to_string()],
            classifier_timeout: 20,
            retrieval_timeout: 30,
            grading_timeout: 60,
            generation_timeout: 180,
        }
    }
}

impl WorkflowConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout)
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout)
    }

    pub fn grading_timeout(&self) -> Duration {
        Duration::from_secs(self.grading_timeout)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout)
    }

    /// Check that the policy values are usable.
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=5).contains(&self.max_retries) {
            return Err(AppError::Config(format!(
                "workflow.maxRetries must be between 1 and 5, got {}",
                self.max_retries
            )));
        }

        if self.excerpt_chars == 0 {
            return Err(AppError::Config(
                "workflow.excerptChars must be greater than zero".to_string(),
            ));
        }

        if self.grading_concurrency == 0 {
            return Err(AppError::Config(
                "workflow.gradingConcurrency must be at least 1".to_string(),
            ));
        }

        if self.secondary_topic.trim().is_empty() {
            return Err(AppError::Config(
                "workflow.secondaryTopic cannot be empty".to_string(),
            ));
        }

        let timeouts = [
            ("classifierTimeout", self.classifier_timeout),
            ("retrievalTimeout", self.retrieval_timeout),
            ("gradingTimeout", self.grading_timeout),
            ("generationTimeout", self.generation_timeout),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(AppError::Config(format!(
                    "workflow.{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    sources: Option<SourcesConfig>,
    workflow: Option<WorkflowConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            grader_model: None,
            api_key: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: None,
            sources: SourcesConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `LEXRAG_WORKSPACE`: Override workspace path
    /// - `LEXRAG_CONFIG`: Path to config file
    /// - `LEXRAG_PROVIDER`: LLM provider
    /// - `LEXRAG_MODEL`: Generation model
    /// - `LEXRAG_GRADER_MODEL`: Router/grader model
    /// - `LEXRAG_API_KEY`: API key
    /// - `LEXRAG_SECONDARY_TOPIC`: Topic label routed to the remote index
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("LEXRAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("LEXRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.lexrag_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("LEXRAG_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("LEXRAG_MODEL") {
            config.model = model;
        }

        if let Ok(model) = std::env::var("LEXRAG_GRADER_MODEL") {
            config.grader_model = Some(model);
        }

        if let Ok(topic) = std::env::var("LEXRAG_SECONDARY_TOPIC") {
            config.workflow.secondary_topic = topic;
        }

        config.api_key = std::env::var("LEXRAG_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            if llm.grader_model.is_some() {
                result.grader_model = llm.grader_model.clone();
            }

            result.llm = Some(llm);
        }

        if let Some(sources) = config_file.sources {
            result.sources = sources;
        }

        if let Some(workflow) = config_file.workflow {
            result.workflow = workflow;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .lexrag directory.
    pub fn lexrag_dir(&self) -> PathBuf {
        self.workspace.join(".lexrag")
    }

    /// Ensure the .lexrag directory exists.
    pub fn ensure_lexrag_dir(&self) -> AppResult<()> {
        let dir = self.lexrag_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .lexrag directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Model used by the router and graders.
    pub fn grader_model(&self) -> &str {
        self.grader_model.as_deref().unwrap_or(&self.model)
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint configured for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<&str> {
        self.get_provider_config(provider)
            .and_then(ProviderConfig::endpoint)
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Explicit LEXRAG_API_KEY wins
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|_| provider == "openai"),
        }
    }

    /// Validate configuration for the active provider and workflow policy.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.as_str(),
                _ => "OPENAI_API_KEY",
            };
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        if !KNOWN_PROVIDERS.contains(&self.sources.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.sources.embedding.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        self.workflow.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.grader_model(), "llama3.2");
        assert_eq!(config.workflow.secondary_topic, "Renta");
        assert_eq!(config.workflow.max_retries, 2);
        assert_eq!(config.workflow.excerpt_chars, 200);
        assert!(!config.verbose);
    }

    #[test]
    fn test_lexrag_dir() {
        let config = AppConfig::default();
        assert!(config.lexrag_dir().ends_with(".lexrag"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workflow_bounds() {
        let mut workflow = WorkflowConfig::default();
        assert!(workflow.validate().is_ok());

        workflow.max_retries = 0;
        assert!(workflow.validate().is_err());

        workflow.max_retries = 6;
        assert!(workflow.validate().is_err());

        workflow.max_retries = 3;
        workflow.grading_timeout = 0;
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  graderModel: qwen2.5
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: llama3.1
logging:
  level: warn
  color: false
workflow:
  secondaryTopic: IVA
  maxRetries: 3
sources:
  remote:
    host: https://ejhr.svc.pinecone.io
    namespace: renta
    apiKeyEnv: PINECONE_API_KEY
    topK: 5
    embeddingModel: text-embedding-3-large
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.model, "llama3.1");
        assert_eq!(merged.grader_model(), "qwen2.5");
        assert_eq!(merged.provider_endpoint("ollama"), Some("http://gpu-box:11434"));
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
        assert_eq!(merged.workflow.secondary_topic, "IVA");
        assert_eq!(merged.workflow.max_retries, 3);
        // Unspecified workflow fields keep their defaults
        assert_eq!(merged.workflow.excerpt_chars, 200);
        assert_eq!(
            merged.sources.remote.host.as_deref(),
            Some("https://ejhr.svc.pinecone.io")
        );
        assert_eq!(merged.sources.local.collection, "legal-docs-chroma");
    }
}
