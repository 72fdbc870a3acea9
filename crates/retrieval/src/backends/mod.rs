//! Evidence source backends.

pub mod chroma;
pub mod fixed;
pub mod pinecone;
pub mod tavily;

pub use chroma::LocalIndexSource;
pub use fixed::StaticSource;
pub use pinecone::RemoteIndexSource;
pub use tavily::WebSearchSource;
