//! Local semantic index over a Chroma-compatible HTTP API.
//!
//! Chroma addresses collections by id, so the configured collection name is
//! resolved once and cached.

use crate::embedders::Embedder;
use crate::source::EvidenceSource;
use crate::types::SourceHit;
use lexrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: [&'static str; 3],
}

/// Chroma answers one result list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<Option<f32>>>,
}

/// Primary evidence source.
pub struct LocalIndexSource {
    client: reqwest::Client,
    endpoint: String,
    collection: String,
    top_k: usize,
    embedder: Arc<dyn Embedder>,
    collection_id: OnceCell<String>,
}

impl LocalIndexSource {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        top_k: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            top_k,
            embedder,
            collection_id: OnceCell::new(),
        }
    }

    async fn resolve_collection(&self) -> AppResult<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections/{}", self.endpoint, self.collection);
                let response = self.client.get(&url).send().await.map_err(|e| {
                    AppError::Retrieval(format!("Chroma request failed: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(AppError::Retrieval(format!(
                        "Chroma collection '{}' not available ({})",
                        self.collection,
                        response.status()
                    )));
                }

                let info: CollectionInfo = response.json().await.map_err(|e| {
                    AppError::Retrieval(format!("Failed to parse Chroma collection: {}", e))
                })?;
                tracing::debug!("Resolved Chroma collection {} -> {}", self.collection, info.id);
                Ok::<String, AppError>(info.id)
            })
            .await?;

        Ok(id.as_str())
    }
}

/// Flatten the first result list into hits, best first.
fn hits_from_response(response: QueryResponse) -> Vec<SourceHit> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response.documents.into_iter().next().unwrap_or_default();
    let metadatas = response.metadatas.into_iter().next().unwrap_or_default();
    let distances = response.distances.into_iter().next().unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let content = documents.get(i).cloned().flatten()?;
            let source_id = metadatas
                .get(i)
                .and_then(|m| m.as_ref())
                .and_then(|m| m.get("source"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(id);
            let score = distances.get(i).copied().flatten().map(|d| 1.0 - d);

            Some(SourceHit {
                content,
                source_id,
                score,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl EvidenceSource for LocalIndexSource {
    fn name(&self) -> &str {
        "chroma"
    }

    fn location(&self) -> String {
        format!("{} (collection {})", self.endpoint, self.collection)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<SourceHit>> {
        let embedding = self.embedder.embed(query).await?;
        let collection_id = self.resolve_collection().await?;

        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.endpoint, collection_id
        );
        let request = QueryRequest {
            query_embeddings: vec![embedding.as_slice()],
            n_results: self.top_k,
            include: ["documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Chroma query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Chroma query error {}: {}",
                status, body
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Chroma response: {}", e)))?;

        let hits = hits_from_response(body);
        tracing::debug!("Chroma returned {} hits", hits.len());
        Ok(hits)
    }
}
