//! Evidence source abstraction.

use crate::types::SourceHit;
use lexrag_core::AppResult;

/// A backend that answers a text query with ranked hits.
///
/// Implementations are shared across runs behind `Arc<dyn EvidenceSource>`
/// and must not hold per-run state.
#[async_trait::async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Short backend name (e.g., "chroma", "pinecone", "tavily", "static").
    fn name(&self) -> &str;

    /// Where the backend reads from, for display.
    fn location(&self) -> String;

    /// Run one query. Hits are returned best first.
    async fn search(&self, query: &str) -> AppResult<Vec<SourceHit>>;
}
