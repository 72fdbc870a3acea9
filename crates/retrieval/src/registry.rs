//! Source registry: the process-wide set of configured evidence sources.
//!
//! Built once at start-up from [`SourcesConfig`] and shared read-only by
//! every run. A source whose credentials or host are missing is left out;
//! selecting it later behaves like a retrieval that found nothing.

use crate::backends::{LocalIndexSource, RemoteIndexSource, StaticSource, WebSearchSource};
use crate::embedders::create_embedder;
use crate::source::EvidenceSource;
use crate::types::SourceSelector;
use lexrag_core::{AppResult, SourcesConfig};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct SourceRegistry {
    primary: Option<Arc<dyn EvidenceSource>>,
    secondary: Option<Arc<dyn EvidenceSource>>,
    web: Option<Arc<dyn EvidenceSource>>,
}

/// One line of `lexrag sources` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescription {
    pub role: &'static str,
    pub backend: Option<String>,
    pub location: Option<String>,
}

impl SourceRegistry {
    pub fn new(
        primary: Option<Arc<dyn EvidenceSource>>,
        secondary: Option<Arc<dyn EvidenceSource>>,
        web: Option<Arc<dyn EvidenceSource>>,
    ) -> Self {
        Self {
            primary,
            secondary,
            web,
        }
    }

    /// Build every configured source. Fixture paths are resolved against
    /// `workspace` when relative.
    pub fn from_config(config: &SourcesConfig, workspace: &Path) -> AppResult<Self> {
        let primary: Arc<dyn EvidenceSource> = match &config.local.fixture {
            Some(path) => Arc::new(StaticSource::from_file(&workspace.join(path))?),
            None => {
                let embedder = create_embedder(&config.embedding, &config.local.embedding_model)?;
                Arc::new(LocalIndexSource::new(
                    &config.local.endpoint,
                    &config.local.collection,
                    config.local.top_k,
                    embedder,
                ))
            }
        };

        let secondary: Option<Arc<dyn EvidenceSource>> = match &config.remote.fixture {
            Some(path) => Some(Arc::new(StaticSource::from_file(&workspace.join(path))?)),
            None => match (&config.remote.host, read_secret(&config.remote.api_key_env)) {
                (Some(host), Some(api_key)) => {
                    let embedder =
                        create_embedder(&config.embedding, &config.remote.embedding_model)?;
                    Some(Arc::new(RemoteIndexSource::new(
                        host,
                        &config.remote.namespace,
                        api_key,
                        config.remote.top_k,
                        embedder,
                    )))
                }
                (None, _) => {
                    tracing::info!("Remote index host not configured; secondary source disabled");
                    None
                }
                (Some(_), None) => {
                    tracing::warn!(
                        "${} is not set; secondary source disabled",
                        config.remote.api_key_env
                    );
                    None
                }
            },
        };

        let web: Option<Arc<dyn EvidenceSource>> = match &config.web.fixture {
            Some(path) => Some(Arc::new(StaticSource::from_file(&workspace.join(path))?)),
            None => match read_secret(&config.web.api_key_env) {
                Some(api_key) => Some(Arc::new(WebSearchSource::new(
                    &config.web.endpoint,
                    api_key,
                    config.web.max_results,
                ))),
                None => {
                    tracing::warn!(
                        "${} is not set; web fallback disabled",
                        config.web.api_key_env
                    );
                    None
                }
            },
        };

        Ok(Self::new(Some(primary), secondary, web))
    }

    /// Index source for a router selection.
    pub fn index(&self, selector: SourceSelector) -> Option<Arc<dyn EvidenceSource>> {
        match selector {
            SourceSelector::Primary => self.primary.clone(),
            SourceSelector::Secondary => self.secondary.clone(),
        }
    }

    /// Web fallback source.
    pub fn web(&self) -> Option<Arc<dyn EvidenceSource>> {
        self.web.clone()
    }

    pub fn describe(&self) -> Vec<SourceDescription> {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("web", &self.web),
        ]
        .into_iter()
        .map(|(role, source)| SourceDescription {
            role,
            backend: source.as_ref().map(|s| s.name().to_string()),
            location: source.as_ref().map(|s| s.location()),
        })
        .collect()
    }
}

fn read_secret(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, r#"[{"content": "texto", "sourceId": "doc.pdf"}]"#).unwrap();
        path
    }

    #[test]
    fn test_fixtures_replace_live_backends() {
        let temp = TempDir::new().unwrap();
        let mut config = SourcesConfig::default();
        config.local.fixture = Some(write_fixture(temp.path(), "local.json"));
        config.remote.fixture = Some("remote.json".into());
        write_fixture(temp.path(), "remote.json");
        config.web.fixture = Some(write_fixture(temp.path(), "web.json"));

        let registry = SourceRegistry::from_config(&config, temp.path()).unwrap();

        assert_eq!(registry.index(SourceSelector::Primary).unwrap().name(), "static");
        assert_eq!(registry.index(SourceSelector::Secondary).unwrap().name(), "static");
        assert!(registry.web().is_some());
    }

    #[test]
    fn test_secondary_disabled_without_host() {
        let temp = TempDir::new().unwrap();
        let config = SourcesConfig::default();

        let registry = SourceRegistry::from_config(&config, temp.path()).unwrap();

        assert_eq!(registry.index(SourceSelector::Primary).unwrap().name(), "chroma");
        assert!(registry.index(SourceSelector::Secondary).is_none());
    }

    #[test]
    fn test_web_disabled_without_key() {
        let temp = TempDir::new().unwrap();
        let mut config = SourcesConfig::default();
        config.web.api_key_env = "LEXRAG_TEST_UNSET_TAVILY_KEY".to_string();

        let registry = SourceRegistry::from_config(&config, temp.path()).unwrap();
        assert!(registry.web().is_none());
    }

    #[test]
    fn test_describe_lists_all_roles() {
        let primary: Arc<dyn EvidenceSource> = Arc::new(StaticSource::new("mem", Vec::new()));
        let registry = SourceRegistry::new(Some(primary), None, None);

        let rows = registry.describe();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].backend.as_deref(), Some("static"));
        assert_eq!(rows[1].role, "secondary");
        assert!(rows[1].backend.is_none());
    }
}
