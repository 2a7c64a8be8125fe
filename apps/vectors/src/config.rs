//! Configuration for the vectors CLI

use clap::ValueEnum;
use domain_vector_search::{EmbeddingConfig, IngestionConfig};

/// Vector store the corpus is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// OpenSearch k-NN over REST
    #[value(name = "opensearch")]
    OpenSearch,
    /// Qdrant over gRPC
    Qdrant,
    /// Exact in-process index, the endpoint is ignored
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    /// Backend endpoint
    pub url: String,
    pub ingestion: IngestionConfig,
    pub embedding: EmbeddingConfig,
    pub query: String,
    pub k: usize,
}
