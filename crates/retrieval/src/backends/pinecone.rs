//! Remote vector index over a Pinecone-compatible query API.

use crate::embedders::Embedder;
use crate::source::EvidenceSource;
use crate::types::SourceHit;
use lexrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Secondary evidence source, selected by topic.
pub struct RemoteIndexSource {
    client: reqwest::Client,
    host: String,
    namespace: String,
    api_key: String,
    top_k: usize,
    embedder: Arc<dyn Embedder>,
}

impl RemoteIndexSource {
    pub fn new(
        host: impl Into<String>,
        namespace: impl Into<String>,
        api_key: impl Into<String>,
        top_k: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            api_key: api_key.into(),
            top_k,
            embedder,
        }
    }
}

/// Document text lives in the `text` metadata field.
fn hits_from_matches(matches: Vec<Match>) -> Vec<SourceHit> {
    matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata.unwrap_or_default();
            let content = metadata
                .get("text")
                .and_then(|v| v.as_str())
                .filter(|t| !t.trim().is_empty())?
                .to_string();
            let source_id = metadata
                .get("source")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(m.id);

            Some(SourceHit {
                content,
                source_id,
                score: m.score,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl EvidenceSource for RemoteIndexSource {
    fn name(&self) -> &str {
        "pinecone"
    }

    fn location(&self) -> String {
        format!("{} (namespace {})", self.host, self.namespace)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<SourceHit>> {
        let embedding = self.embedder.embed(query).await?;

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&QueryRequest {
                vector: &embedding,
                top_k: self.top_k,
                namespace: &self.namespace,
                include_metadata: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Pinecone query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Pinecone query error {}: {}",
                status, body
            )));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse Pinecone response: {}", e))
        })?;

        let hits = hits_from_matches(body.matches);
        tracing::debug!("Pinecone returned {} hits", hits.len());
        Ok(hits)
    }
}
