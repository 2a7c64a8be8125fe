//! Integration tests against real vector stores
//!
//! These tests use testcontainers to ensure:
//! - Index creation and the dimension check work on the real engines
//! - Bulk writes are searchable and idempotent by document id
//! - Scores come back on the shared similarity scale

use std::sync::Arc;

use domain_vector_search::*;
use test_utils::{TestDataBuilder, TestOpenSearch, TestQdrant, assertions::*};

fn generator() -> Arc<EmbeddingGenerator> {
    Arc::new(EmbeddingGenerator::new(
        Arc::new(HashingProvider::new()),
        EmbeddingConfig::new(EmbeddingProviderType::Local, EmbeddingModel::custom("hashing", 128)),
    ))
}

fn quotes() -> Vec<Document> {
    vec![
        Document::with_id("hello", "Hello World!")
            .with_metadata("sentiment", "positive")
            .with_metadata("source", "abc.txt"),
        Document::with_id("einstein", "If you want to live a happy life, tie it to a goal, not to people or things.")
            .with_metadata("author", "A. Einstein"),
        Document::with_id("seneca", "Not how long, but how well you have lived is the main thing.")
            .with_metadata("author", "Seneca"),
    ]
}

async fn exercise<C: VectorIndexClient + 'static>(client: Arc<C>, index_name: String) {
    let service = VectorSearchService::new(
        Arc::clone(&client),
        generator(),
        IngestionConfig::new(index_name).with_batch_size(2),
    );

    let report = service.ingest(quotes()).await.unwrap().into_result().unwrap();
    assert_eq!(report.batches, 2);
    assert_eq!(service.count().await.unwrap(), 3);

    // Re-ingest leaves a single record per id
    service.ingest(quotes()).await.unwrap().into_result().unwrap();
    assert_eq!(service.count().await.unwrap(), 3);

    let hits = service.query("Hi World", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.content, "Hello World!");

    let hits = service.query("Hello World!", 3).await.unwrap();
    assert_close(hits[0].score, 1.0, 1e-3, "exact match");
    assert_descending(&hits.iter().map(|h| h.score).collect::<Vec<_>>(), "ranking");

    let docs = service.get_documents(&["seneca".into()]).await.unwrap();
    let seneca = assert_some(docs.into_iter().next(), "seneca should be stored");
    assert_eq!(
        seneca.metadata.get("author"),
        Some(&MetadataValue::String("Seneca".to_string()))
    );

    let err = client
        .ensure_index(service.index_name(), IndexConfig::new(64))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VectorError::IndexDimensionConflict { existing: 128, requested: 64, .. }
    ));

    assert!(service.delete_index().await.unwrap());
    assert!(service.get_index().await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_opensearch_ingest_and_query() {
    let opensearch = TestOpenSearch::new().await;
    let builder = TestDataBuilder::from_test_name("test_opensearch_ingest_and_query");

    let client = OpenSearchIndexClient::new(OpenSearchConfig::new(opensearch.url())).unwrap();
    exercise(Arc::new(client), builder.index_name("quotes")).await;
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_qdrant_ingest_and_query() {
    let qdrant = TestQdrant::new().await;
    let builder = TestDataBuilder::from_test_name("test_qdrant_ingest_and_query");

    let client = QdrantIndexClient::new(QdrantConfig::new(qdrant.url().to_string())).unwrap();
    exercise(Arc::new(client), builder.index_name("quotes")).await;
}
