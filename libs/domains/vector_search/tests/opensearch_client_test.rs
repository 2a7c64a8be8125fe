//! OpenSearch client tests against a mocked REST API

use domain_vector_search::{
    BulkOutcome, DistanceMetric, Document, DocumentId, EmbeddingVector, Index, IndexConfig,
    IndexedRecord, OpenSearchConfig, OpenSearchIndexClient, VectorError, VectorIndexClient,
};
use serde_json::json;
use test_utils::assertions::assert_close;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenSearchIndexClient {
    OpenSearchIndexClient::new(OpenSearchConfig::new(server.uri()).with_timeout(5)).unwrap()
}

fn record(id: &str, content: &str, vector: Vec<f32>) -> IndexedRecord {
    let dimension = vector.len();
    IndexedRecord::new(Document::with_id(id, content), EmbeddingVector::new(vector), dimension).unwrap()
}

fn mapping(dimension: usize) -> serde_json::Value {
    json!({
        "vector": {
            "mappings": {
                "properties": {
                    "vector_field": {
                        "type": "knn_vector",
                        "dimension": dimension,
                        "method": {
                            "name": "hnsw",
                            "engine": "faiss",
                            "space_type": "cosinesimil",
                            "parameters": {"m": 16, "ef_construction": 512}
                        }
                    },
                    "text": {"type": "text"},
                    "metadata": {"type": "object"}
                }
            }
        }
    })
}

fn already_exists() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": {
            "type": "resource_already_exists_exception",
            "reason": "index [vector/abc] already exists"
        },
        "status": 400
    }))
}

#[tokio::test]
async fn test_ensure_index_creates_knn_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/vector"))
        .and(body_string_contains("\"knn_vector\""))
        .and(body_string_contains("\"dimension\":384"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;

    let index = client(&server)
        .ensure_index("vector", IndexConfig::new(384))
        .await
        .unwrap();

    assert_eq!(index.name, "vector");
    assert_eq!(index.dimension(), 384);
}

#[tokio::test]
async fn test_ensure_existing_index_with_same_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/vector"))
        .respond_with(already_exists())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector/_mapping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mapping(384)))
        .expect(1)
        .mount(&server)
        .await;

    let index = client(&server)
        .ensure_index("vector", IndexConfig::new(384))
        .await
        .unwrap();

    assert_eq!(index.dimension(), 384);
    assert_eq!(index.distance(), DistanceMetric::Cosine);
}

#[tokio::test]
async fn test_ensure_existing_index_with_other_dimension_conflicts() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/vector"))
        .respond_with(already_exists())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector/_mapping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mapping(384)))
        .mount(&server)
        .await;

    let err = client(&server)
        .ensure_index("vector", IndexConfig::new(768))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VectorError::IndexDimensionConflict { existing: 384, requested: 768, ref index } if index == "vector"
    ));
}

#[tokio::test]
async fn test_bulk_reports_per_item_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(query_param("refresh", "true"))
        .and(body_string_contains("\"_id\":\"a\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "vector", "_id": "a", "status": 201, "result": "created"}},
                {"index": {"_index": "vector", "_id": "b", "status": 200, "result": "updated"}},
                {"index": {
                    "_index": "vector",
                    "_id": "c",
                    "status": 429,
                    "error": {
                        "type": "es_rejected_execution_exception",
                        "reason": "rejected execution of coordinating operation"
                    }
                }}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let index = Index::new("vector", IndexConfig::new(2));
    let records = vec![
        record("a", "alpha", vec![1.0, 0.0]),
        record("b", "beta", vec![0.0, 1.0]),
        record("c", "gamma", vec![0.6, 0.8]),
    ];

    let result = client(&server).bulk_upsert(&index, &records).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.succeeded_ids(), vec![DocumentId::from("a"), DocumentId::from("b")]);
    assert_eq!(result.items[0].outcome, BulkOutcome::Created);
    assert_eq!(result.items[1].outcome, BulkOutcome::Updated);

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, DocumentId::from("c"));
    assert_eq!(failures[0].code, "es_rejected_execution_exception");
    assert!(failures[0].retryable);

    let err = result.into_result().unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_bulk_rejects_wrong_dimension_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let index = Index::new("vector", IndexConfig::new(3));
    let records = vec![record("a", "alpha", vec![1.0, 0.0])];

    let err = client(&server).bulk_upsert(&index, &records).await.unwrap_err();
    assert!(matches!(
        err,
        VectorError::DimensionMismatch { expected: 3, actual: 2, document_id: Some(ref id) } if id.as_str() == "a"
    ));
}

#[tokio::test]
async fn test_missing_index_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gone/_search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index [gone]"
            },
            "status": 404
        })))
        .mount(&server)
        .await;

    let index = Index::new("gone", IndexConfig::new(2));
    let err = client(&server).search(&index, &[1.0, 0.0], 1).await.unwrap_err();

    assert!(matches!(err, VectorError::IndexNotFound(ref name) if name == "gone"));
}

#[tokio::test]
async fn test_unavailable_cluster_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vector/_count"))
        .respond_with(ResponseTemplate::new(503).set_body_string("cluster unavailable"))
        .mount(&server)
        .await;

    let index = Index::new("vector", IndexConfig::new(2));
    let err = client(&server).count(&index).await.unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_search_converts_scores_and_reads_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vector/_search"))
        .and(body_string_contains("\"knn\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {
                        "_index": "vector",
                        "_id": "hello",
                        "_score": 0.9,
                        "_source": {
                            "text": "Hello World!",
                            "metadata": {"source": "abc.txt", "sentiment": "positive"}
                        }
                    },
                    {
                        "_index": "vector",
                        "_id": "seneca",
                        "_score": 0.5,
                        "_source": {"text": "Not how long, but how well you have lived is the main thing."}
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let index = Index::new("vector", IndexConfig::new(2));
    let hits = client(&server).search(&index, &[1.0, 0.0], 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.id.as_str(), "hello");
    assert_eq!(hits[0].document.content, "Hello World!");
    assert_eq!(hits[0].document.metadata.len(), 2);
    // cosinesimil scores are (1 + cos) / 2
    assert_close(hits[0].score, 0.8, 1e-5, "first hit");
    assert_close(hits[1].score, 0.0, 1e-5, "second hit");
    assert!(hits[1].document.metadata.is_empty());
}

#[tokio::test]
async fn test_get_documents_skips_missing_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vector/_mget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [
                {"_index": "vector", "_id": "a", "found": true, "_source": {"text": "alpha", "metadata": {}}},
                {"_index": "vector", "_id": "z", "found": false}
            ]
        })))
        .mount(&server)
        .await;

    let index = Index::new("vector", IndexConfig::new(2));
    let docs = client(&server)
        .get_documents(&index, &[DocumentId::from("a"), DocumentId::from("z")])
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "alpha");
}
