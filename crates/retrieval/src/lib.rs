//! Evidence retrieval for LexRAG.
//!
//! - Evidence model with provenance ([`Evidence`], [`EvidenceSet`])
//! - [`EvidenceSource`] trait with Chroma, Pinecone, Tavily and static backends
//! - Query embedders (Ollama, OpenAI)
//! - [`SourceRegistry`] built from configuration

pub mod backends;
pub mod embedders;
pub mod registry;
pub mod source;
pub mod types;

pub use backends::{LocalIndexSource, RemoteIndexSource, StaticSource, WebSearchSource};
pub use embedders::{create_embedder, Embedder};
pub use registry::{SourceDescription, SourceRegistry};
pub use source::EvidenceSource;
pub use types::{Evidence, EvidenceSet, Origin, SourceHit, SourceSelector};
