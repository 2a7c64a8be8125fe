//! Vector Search Domain Library
//!
//! Ingests text documents into a vector index and answers nearest-neighbour
//! queries over it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ VectorSearchService  │  ← Facade over one index + one generator
//! └──────┬────────┬──────┘
//!        │        │
//! ┌──────▼──────┐ ┌▼────────────┐     ┌────────────────────┐
//! │ Ingestion   │ │ QueryEngine │ ──▶ │ EmbeddingGenerator │
//! │ Pipeline    │ └──────┬──────┘     └─────────┬──────────┘
//! └──────┬──────┘        │                      │
//! ┌──────▼───────────────▼──┐         ┌─────────▼──────────┐
//! │ VectorIndexClient       │         │ EmbeddingProvider  │
//! │ (trait)                 │         │ (trait)            │
//! └──────┬──────────────────┘         └─────────┬──────────┘
//!        │                                      │
//!  OpenSearch / Qdrant / in-memory       OpenAI / TEI / hashing
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_vector_search::{
//!     Document, EmbeddingConfig, EmbeddingGenerator, HashingProvider, IngestionConfig,
//!     OpenSearchConfig, OpenSearchIndexClient, VectorSearchService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OpenSearchIndexClient::new(OpenSearchConfig::new("http://localhost:9200"))?);
//! let generator = Arc::new(EmbeddingGenerator::new(
//!     Arc::new(HashingProvider::new()),
//!     EmbeddingConfig::default(),
//! ));
//!
//! let service = VectorSearchService::new(client, generator, IngestionConfig::default());
//! service
//!     .ingest(vec![Document::new("Hello World!").with_metadata("source", "abc.txt")])
//!     .await?
//!     .into_result()?;
//!
//! for hit in service.query("Hi World", 1).await? {
//!     println!("{} ({})", hit.document.content, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod embedding;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod query;
pub mod service;

// Re-export commonly used types
pub use embedding::{
    provider_from_env, EmbeddingConfig, EmbeddingGenerator, EmbeddingOptions, EmbeddingProvider,
    HashingProvider, OpenAIConfig, OpenAIProvider, TeiConfig, TeiProvider,
};
pub use error::{QueryStage, VectorError, VectorResult};
pub use index::{
    InMemoryIndexClient, OpenSearchConfig, OpenSearchIndexClient, QdrantConfig, QdrantIndexClient,
    VectorIndexClient,
};
pub use ingestion::{BatchFailure, IngestionConfig, IngestionPipeline, IngestionReport, RetryPolicy};
pub use models::{
    AnnEngine, BulkItem, BulkItemFailure, BulkOutcome, BulkResult, Device, DistanceMetric,
    Document, DocumentId, EmbeddingModel, EmbeddingProviderType, EmbeddingVector, HnswConfig,
    Index, IndexConfig, IndexedRecord, Metadata, MetadataValue, SearchResult,
};
pub use query::QueryEngine;
pub use service::VectorSearchService;
