mod client;
mod memory;
pub mod opensearch;
pub mod qdrant;

pub use client::VectorIndexClient;
pub use memory::InMemoryIndexClient;
pub use opensearch::{OpenSearchConfig, OpenSearchIndexClient};
pub use qdrant::{QdrantConfig, QdrantIndexClient};

#[cfg(test)]
pub use client::MockVectorIndexClient;
