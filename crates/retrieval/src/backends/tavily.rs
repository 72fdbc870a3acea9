//! General web search over a Tavily-compatible API.

use crate::source::EvidenceSource;
use crate::types::SourceHit;
use lexrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f32>,
}

/// Fallback evidence source.
pub struct WebSearchSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

impl WebSearchSource {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
        }
    }
}

fn hits_from_results(results: Vec<SearchResult>) -> Vec<SourceHit> {
    results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(|r| {
            let source_id = if r.url.is_empty() {
                r.title.unwrap_or_else(|| "web".to_string())
            } else {
                r.url
            };
            SourceHit {
                content: r.content,
                source_id,
                score: r.score,
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl EvidenceSource for WebSearchSource {
    fn name(&self) -> &str {
        "tavily"
    }

    fn location(&self) -> String {
        self.endpoint.clone()
    }

    async fn search(&self, query: &str) -> AppResult<Vec<SourceHit>> {
        let response = self
            .client
            .post(format!("{}/search", self.endpoint))
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Web search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Web search error {}: {}",
                status, body
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse web search response: {}", e))
        })?;

        let hits = hits_from_results(body.results);
        tracing::debug!("Web search returned {} hits", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_from_results() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "query": "tarifa IVA",
            "results": [
                {"title": "DIAN", "url": "https://www.dian.gov.co/iva", "content": "La tarifa general es 19%", "score": 0.9},
                {"title": "Vacío", "url": "https://example.com", "content": "  "},
                {"title": "Sin URL", "content": "Resumen"}
            ]
        }))
        .unwrap();

        let hits = hits_from_results(body.results);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_id, "https://www.dian.gov.co/iva");
        assert_eq!(hits[1].source_id, "Sin URL");
        assert_eq!(hits[1].score, None);
    }

    #[test]
    fn test_location_trims_slash() {
        let source = WebSearchSource::new("https://api.tavily.com/", "tvly-key", 3);
        assert_eq!(source.location(), "https://api.tavily.com");
    }
}
