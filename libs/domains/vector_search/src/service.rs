use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;
use tracing::info;

use crate::embedding::EmbeddingGenerator;
use crate::error::{VectorError, VectorResult};
use crate::index::VectorIndexClient;
use crate::ingestion::{IngestionConfig, IngestionPipeline, IngestionReport};
use crate::models::{Document, DocumentId, Index, SearchResult};
use crate::query::QueryEngine;

/// Vector search service providing high-level operations
///
/// Owns one index client and one embedding generator, shared by ingestion
/// and queries, and targets the index named in its `IngestionConfig`.
pub struct VectorSearchService<C: VectorIndexClient + ?Sized + 'static> {
    client: Arc<C>,
    generator: Arc<EmbeddingGenerator>,
    pipeline: IngestionPipeline<C>,
    queries: QueryEngine<C>,
}

impl<C: VectorIndexClient + ?Sized + 'static> VectorSearchService<C> {
    pub fn new(client: Arc<C>, generator: Arc<EmbeddingGenerator>, config: IngestionConfig) -> Self {
        Self {
            pipeline: IngestionPipeline::new(Arc::clone(&client), Arc::clone(&generator), config),
            queries: QueryEngine::new(Arc::clone(&client), Arc::clone(&generator)),
            client,
            generator,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.pipeline.config().index_name
    }

    pub fn generator(&self) -> &EmbeddingGenerator {
        &self.generator
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    // ========================================================================
    // Index lifecycle
    // ========================================================================

    /// Create the configured index for the generator's dimension, or verify it
    pub async fn ensure_index(&self) -> VectorResult<Index> {
        let config = self.pipeline.config().index_config(self.generator.dimension());
        self.client.ensure_index(self.index_name(), config).await
    }

    pub async fn get_index(&self) -> VectorResult<Option<Index>> {
        self.client.get_index(self.index_name()).await
    }

    pub async fn delete_index(&self) -> VectorResult<bool> {
        let deleted = self.client.delete_index(self.index_name()).await?;
        if deleted {
            info!(index = %self.index_name(), "Deleted index");
        }
        Ok(deleted)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    pub async fn ingest<I>(&self, documents: I) -> VectorResult<IngestionReport>
    where
        I: IntoIterator<Item = Document>,
        I::IntoIter: Send,
    {
        self.pipeline.ingest(documents).await
    }

    pub async fn ingest_stream<S>(
        &self,
        documents: S,
        cancel: watch::Receiver<bool>,
    ) -> VectorResult<IngestionReport>
    where
        S: Stream<Item = Document> + Send,
    {
        self.pipeline.ingest_stream(documents, cancel).await
    }

    // ========================================================================
    // Queries and lookups
    // ========================================================================

    /// Top-k documents in the configured index for `text`
    pub async fn query(&self, text: &str, k: usize) -> VectorResult<Vec<SearchResult>> {
        self.queries.query_by_name(self.index_name(), text, k).await
    }

    pub async fn query_index(&self, index: &Index, text: &str, k: usize) -> VectorResult<Vec<SearchResult>> {
        self.queries.query(index, text, k).await
    }

    pub async fn get_documents(&self, ids: &[DocumentId]) -> VectorResult<Vec<Document>> {
        let index = self.require_index().await?;
        self.client.get_documents(&index, ids).await
    }

    pub async fn count(&self) -> VectorResult<u64> {
        let index = self.require_index().await?;
        self.client.count(&index).await
    }

    async fn require_index(&self) -> VectorResult<Index> {
        self.get_index()
            .await?
            .ok_or_else(|| VectorError::IndexNotFound(self.index_name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingConfig, HashingProvider};
    use crate::index::{InMemoryIndexClient, MockVectorIndexClient};

    fn generator() -> Arc<EmbeddingGenerator> {
        Arc::new(EmbeddingGenerator::new(
            Arc::new(HashingProvider::new()),
            EmbeddingConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_ensure_index_uses_generator_dimension() {
        let mut client = MockVectorIndexClient::new();
        client
            .expect_ensure_index()
            .withf(|name, config| name == "vector" && config.dimension == 384)
            .returning(|name, config| Ok(Index::new(name, config)));

        let service = VectorSearchService::new(Arc::new(client), generator(), IngestionConfig::default());
        let index = service.ensure_index().await.unwrap();

        assert_eq!(index.dimension(), 384);
    }

    #[tokio::test]
    async fn test_count_without_index_is_not_found() {
        let service = VectorSearchService::new(
            Arc::new(InMemoryIndexClient::new()),
            generator(),
            IngestionConfig::new("empty"),
        );

        assert!(matches!(
            service.count().await,
            Err(VectorError::IndexNotFound(name)) if name == "empty"
        ));
        assert!(!service.delete_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_ingest_then_lookup() {
        let service = VectorSearchService::new(
            Arc::new(InMemoryIndexClient::new()),
            generator(),
            IngestionConfig::new("svc"),
        );

        let report = service
            .ingest(vec![Document::with_id("a", "Hello World!")])
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(report.committed_count(), 1);

        assert_eq!(service.count().await.unwrap(), 1);
        let docs = service.get_documents(&["a".into()]).await.unwrap();
        assert_eq!(docs[0].content, "Hello World!");

        let hits = service.query("Hello World!", 1).await.unwrap();
        assert_eq!(hits[0].document.id.as_str(), "a");
    }
}
