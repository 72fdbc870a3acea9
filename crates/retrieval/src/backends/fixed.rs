//! In-memory source with a fixed hit list.
//!
//! Used for offline runs (a JSON fixture file in place of a live index) and
//! by tests.

use crate::source::EvidenceSource;
use crate::types::SourceHit;
use lexrag_core::{AppError, AppResult};
use std::path::Path;

pub struct StaticSource {
    label: String,
    hits: Vec<SourceHit>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, hits: Vec<SourceHit>) -> Self {
        Self {
            label: label.into(),
            hits,
        }
    }

    /// Load hits from a JSON array of `{content, sourceId, score?}`.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Retrieval(format!("Failed to read fixture {:?}: {}", path, e))
        })?;
        let hits: Vec<SourceHit> = serde_json::from_str(&contents).map_err(|e| {
            AppError::Retrieval(format!("Failed to parse fixture {:?}: {}", path, e))
        })?;

        Ok(Self::new(path.display().to_string(), hits))
    }
}

#[async_trait::async_trait]
impl EvidenceSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn location(&self) -> String {
        format!("{} ({} hits)", self.label, self.hits.len())
    }

    async fn search(&self, _query: &str) -> AppResult<Vec<SourceHit>> {
        Ok(self.hits.clone())
    }
}
