use std::time::Duration;

use async_trait::async_trait;
use core_config::FromEnv;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::OpenSearchConfig;
use crate::error::{VectorError, VectorResult};
use crate::index::client::{check_records, VectorIndexClient};
use crate::models::{
    AnnEngine, BulkItem, BulkOutcome, BulkResult, DistanceMetric, Document, DocumentId,
    HnswConfig, Index, IndexConfig, IndexedRecord, SearchResult,
};

const VECTOR_FIELD: &str = "vector_field";
const TEXT_FIELD: &str = "text";
const METADATA_FIELD: &str = "metadata";

/// OpenSearch k-NN backed implementation of VectorIndexClient
pub struct OpenSearchIndexClient {
    client: Client,
    config: OpenSearchConfig,
}

impl OpenSearchIndexClient {
    pub fn new(config: OpenSearchConfig) -> VectorResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(OpenSearchConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url, path)
    }

    fn engine_name(engine: AnnEngine) -> VectorResult<&'static str> {
        match engine {
            AnnEngine::Faiss => Ok("faiss"),
            AnnEngine::Lucene => Ok("lucene"),
            AnnEngine::Nmslib => Ok("nmslib"),
            other => Err(VectorError::Config(format!(
                "Engine '{}' is not available on OpenSearch",
                other
            ))),
        }
    }

    fn space_type(distance: DistanceMetric) -> &'static str {
        match distance {
            DistanceMetric::Cosine => "cosinesimil",
            DistanceMetric::DotProduct => "innerproduct",
            DistanceMetric::Euclidean => "l2",
        }
    }

    fn distance_from_space(space: &str) -> DistanceMetric {
        match space {
            "innerproduct" => DistanceMetric::DotProduct,
            "l2" => DistanceMetric::Euclidean,
            _ => DistanceMetric::Cosine,
        }
    }

    /// Convert a k-NN `_score` back to the shared similarity scale
    fn similarity_from_score(distance: DistanceMetric, score: f32) -> f32 {
        match distance {
            // score = (1 + cos) / 2
            DistanceMetric::Cosine => 2.0 * score - 1.0,
            // score = ip + 1 for ip >= 0, 1 / (1 - ip) otherwise
            DistanceMetric::DotProduct => {
                if score >= 1.0 {
                    score - 1.0
                } else {
                    1.0 - 1.0 / score
                }
            }
            // score = 1 / (1 + d²)
            DistanceMetric::Euclidean => score,
        }
    }

    fn index_body(config: &IndexConfig) -> VectorResult<Value> {
        let hnsw = config.hnsw.unwrap_or_default();
        Ok(json!({
            "settings": {
                "index": {
                    "knn": true,
                    "knn.algo_param.ef_search": hnsw.ef_search
                }
            },
            "mappings": {
                "properties": {
                    VECTOR_FIELD: {
                        "type": "knn_vector",
                        "dimension": config.dimension,
                        "method": {
                            "name": "hnsw",
                            "space_type": Self::space_type(config.distance),
                            "engine": Self::engine_name(config.engine)?,
                            "parameters": {
                                "ef_construction": hnsw.ef_construction,
                                "m": hnsw.m
                            }
                        }
                    },
                    TEXT_FIELD: { "type": "text" },
                    METADATA_FIELD: { "type": "object" }
                }
            }
        }))
    }

    fn index_from_mapping(name: &str, body: &Value) -> VectorResult<Index> {
        // Keyed by concrete index name, which differs from `name` for aliases
        let vector = body
            .as_object()
            .and_then(|indices| indices.values().next())
            .and_then(|index| index.pointer(&format!("/mappings/properties/{}", VECTOR_FIELD)))
            .ok_or_else(|| {
                VectorError::backend(format!("Index '{}' has no '{}' mapping", name, VECTOR_FIELD))
            })?;

        let dimension = vector
            .get("dimension")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                VectorError::backend(format!("Index '{}' mapping has no dimension", name))
            })? as usize;

        let method = vector.get("method");
        let engine = method
            .and_then(|m| m.get("engine"))
            .and_then(Value::as_str)
            .and_then(|e| e.parse::<AnnEngine>().ok())
            .unwrap_or(AnnEngine::Nmslib);
        let distance = method
            .and_then(|m| m.get("space_type"))
            .and_then(Value::as_str)
            .map(Self::distance_from_space)
            .unwrap_or_default();
        let hnsw = method.and_then(|m| m.get("parameters")).map(|p| {
            let defaults = HnswConfig::default();
            HnswConfig {
                m: p.get("m").and_then(Value::as_u64).map_or(defaults.m, |v| v as u32),
                ef_construction: p
                    .get("ef_construction")
                    .and_then(Value::as_u64)
                    .map_or(defaults.ef_construction, |v| v as u32),
                ef_search: defaults.ef_search,
            }
        });

        Ok(Index::new(
            name,
            IndexConfig {
                dimension,
                engine,
                distance,
                hnsw,
            },
        ))
    }

    fn document_from_hit(id: String, source: StoredSource) -> Document {
        Document {
            id: DocumentId::new(id),
            content: source.text,
            metadata: Document::metadata_from_json(&source.metadata),
        }
    }
}

fn transport_error(err: reqwest::Error) -> VectorError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        VectorError::transient_backend(format!("OpenSearch unreachable: {}", err))
    } else {
        VectorError::backend(format!("OpenSearch request failed: {}", err))
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorCause>,
}

#[derive(Debug, Deserialize)]
struct ErrorCause {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reason: Option<String>,
}

/// A non-success response, with the cluster's error type when it sent one
struct ResponseError {
    status: StatusCode,
    kind: Option<String>,
    message: String,
}

impl ResponseError {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let cause = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error);

        let message = match &cause {
            Some(c) => format!("{}: {}", c.kind, c.reason.clone().unwrap_or_default()),
            None => text,
        };

        Self {
            status,
            kind: cause.map(|c| c.kind),
            message,
        }
    }

    fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    fn into_error(self, index: &str) -> VectorError {
        if self.status == StatusCode::NOT_FOUND && self.is("index_not_found_exception") {
            return VectorError::IndexNotFound(index.to_string());
        }

        let message = format!("OpenSearch returned {}: {}", self.status, self.message);
        if is_retryable_status(self.status.as_u16()) {
            VectorError::transient_backend(message)
        } else {
            VectorError::backend(message)
        }
    }
}

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkActionMeta<'a>,
}

#[derive(Serialize)]
struct BulkActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

#[derive(Serialize)]
struct SourceDoc<'a> {
    vector_field: &'a [f32],
    text: &'a str,
    metadata: Value,
}

#[derive(Debug, Default, Deserialize)]
struct StoredSource {
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    index: BulkItemStatus,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    #[serde(rename = "_id")]
    id: String,
    status: u16,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<ErrorCause>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: f32,
    #[serde(rename = "_source", default)]
    source: StoredSource,
}

#[derive(Debug, Deserialize)]
struct MgetResponse {
    docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: StoredSource,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[async_trait]
impl VectorIndexClient for OpenSearchIndexClient {
    async fn ensure_index(&self, name: &str, config: IndexConfig) -> VectorResult<Index> {
        config.validate()?;
        let body = Self::index_body(&config)?;

        let response = self
            .client
            .put(self.url(name))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            info!(index = %name, dimension = config.dimension, engine = %config.engine, "Created OpenSearch index");
            return Ok(Index::new(name, config));
        }

        let error = ResponseError::read(response).await;
        if !error.is("resource_already_exists_exception") {
            return Err(error.into_error(name));
        }

        // Lost the race or the index predates this run; the stored mapping wins
        let existing = self
            .get_index(name)
            .await?
            .ok_or_else(|| VectorError::transient_backend(format!("Index '{}' vanished after create conflict", name)))?;

        if existing.dimension() != config.dimension {
            return Err(VectorError::IndexDimensionConflict {
                index: name.to_string(),
                existing: existing.dimension(),
                requested: config.dimension,
            });
        }

        debug!(index = %name, "Index already exists with matching dimension");
        Ok(existing)
    }

    async fn get_index(&self, name: &str) -> VectorResult<Option<Index>> {
        let response = self
            .client
            .get(self.url(&format!("{}/_mapping", name)))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ResponseError::read(response).await.into_error(name));
        }

        let body: Value = response.json().await.map_err(transport_error)?;
        Self::index_from_mapping(name, &body).map(Some)
    }

    async fn delete_index(&self, name: &str) -> VectorResult<bool> {
        let response = self
            .client
            .delete(self.url(name))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(ResponseError::read(response).await.into_error(name)),
        }
    }

    async fn bulk_upsert(&self, index: &Index, records: &[IndexedRecord]) -> VectorResult<BulkResult> {
        check_records(index, records)?;
        if records.is_empty() {
            return Ok(BulkResult::default());
        }

        let mut body = String::new();
        for record in records {
            let action = BulkAction {
                index: BulkActionMeta {
                    index: &index.name,
                    id: record.id().as_str(),
                },
            };
            let source = SourceDoc {
                vector_field: record.vector.as_slice(),
                text: &record.document.content,
                metadata: record.document.metadata_json(),
            };
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&source)?);
            body.push('\n');
        }

        let mut request = self
            .client
            .post(self.url("_bulk"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        if self.config.refresh_on_write {
            request = request.query(&[("refresh", "true")]);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(ResponseError::read(response).await.into_error(&index.name));
        }

        let bulk: BulkResponse = response.json().await.map_err(transport_error)?;
        if bulk.items.len() != records.len() {
            return Err(VectorError::backend(format!(
                "Bulk response has {} items for {} records",
                bulk.items.len(),
                records.len()
            )));
        }

        let items: Vec<BulkItem> = bulk
            .items
            .into_iter()
            .map(|item| {
                let status = item.index;
                let outcome = match status.error {
                    Some(cause) => BulkOutcome::Failed {
                        code: cause.kind,
                        reason: cause.reason.unwrap_or_default(),
                        retryable: is_retryable_status(status.status),
                    },
                    None if status.status >= 300 => BulkOutcome::Failed {
                        code: status.status.to_string(),
                        reason: status.result.unwrap_or_default(),
                        retryable: is_retryable_status(status.status),
                    },
                    None if status.result.as_deref() == Some("created") => BulkOutcome::Created,
                    None => BulkOutcome::Updated,
                };
                BulkItem {
                    id: DocumentId::new(status.id),
                    outcome,
                }
            })
            .collect();

        let result = BulkResult::new(items);
        let failed = result.failures().len();
        if failed > 0 {
            warn!(index = %index.name, failed, records = records.len(), "Bulk write partially failed");
        } else {
            debug!(index = %index.name, records = records.len(), "Bulk write committed");
        }
        Ok(result)
    }

    async fn search(&self, index: &Index, vector: &[f32], k: usize) -> VectorResult<Vec<SearchResult>> {
        index.check_dimension(vector.len(), None)?;
        if k == 0 {
            return Ok(vec![]);
        }

        let body = json!({
            "size": k,
            "query": {
                "knn": {
                    VECTOR_FIELD: {
                        "vector": vector,
                        "k": k
                    }
                }
            },
            "_source": { "excludes": [VECTOR_FIELD] }
        });

        let response = self
            .client
            .post(self.url(&format!("{}/_search", index.name)))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ResponseError::read(response).await.into_error(&index.name));
        }

        let search: SearchResponse = response.json().await.map_err(transport_error)?;
        let distance = index.distance();

        Ok(search
            .hits
            .hits
            .into_iter()
            .take(k)
            .map(|hit| SearchResult {
                score: Self::similarity_from_score(distance, hit.score),
                document: Self::document_from_hit(hit.id, hit.source),
            })
            .collect())
    }

    async fn get_documents(&self, index: &Index, ids: &[DocumentId]) -> VectorResult<Vec<Document>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .client
            .post(self.url(&format!("{}/_mget", index.name)))
            .query(&[("_source_excludes", VECTOR_FIELD)])
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ResponseError::read(response).await.into_error(&index.name));
        }

        let mget: MgetResponse = response.json().await.map_err(transport_error)?;
        Ok(mget
            .docs
            .into_iter()
            .filter(|doc| doc.found)
            .map(|doc| Self::document_from_hit(doc.id, doc.source))
            .collect())
    }

    async fn count(&self, index: &Index) -> VectorResult<u64> {
        let response = self
            .client
            .get(self.url(&format!("{}/_count", index.name)))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ResponseError::read(response).await.into_error(&index.name));
        }

        let count: CountResponse = response.json().await.map_err(transport_error)?;
        Ok(count.count)
    }
}
