use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use core_config::FromEnv;
use qdrant_client::qdrant::{
    self, value::Kind, CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use tracing::{debug, info};
use uuid::Uuid;

use super::QdrantConfig;
use crate::error::{VectorError, VectorResult};
use crate::index::client::{check_records, VectorIndexClient};
use crate::models::{
    AnnEngine, BulkItem, BulkResult, DistanceMetric, Document, DocumentId, HnswConfig, Index,
    IndexConfig, IndexedRecord, SearchResult,
};

const DOCUMENT_ID_KEY: &str = "document_id";
const TEXT_KEY: &str = "text";
const METADATA_KEY: &str = "metadata";

/// Qdrant-backed implementation of VectorIndexClient
///
/// Each index is a collection. Document ids are arbitrary strings, so points
/// are keyed by a UUIDv5 of the id and the original id travels in the payload.
pub struct QdrantIndexClient {
    client: Qdrant,
}

impl QdrantIndexClient {
    pub fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build Qdrant client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(QdrantConfig::from_env()?)
    }

    fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Euclidean => Distance::Euclid,
            DistanceMetric::DotProduct => Distance::Dot,
        }
    }

    fn from_qdrant_distance(distance: Distance) -> DistanceMetric {
        match distance {
            Distance::Euclid => DistanceMetric::Euclidean,
            Distance::Dot => DistanceMetric::DotProduct,
            _ => DistanceMetric::Cosine,
        }
    }

    /// Qdrant reports euclidean distance; cosine and dot are already similarities
    fn similarity_from_score(distance: DistanceMetric, score: f32) -> f32 {
        match distance {
            DistanceMetric::Euclidean => DistanceMetric::euclidean_score(score * score),
            _ => score,
        }
    }

    fn point_id(id: &DocumentId) -> PointId {
        PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_str().as_bytes()).to_string())
    }

    fn point_id_string(point_id: Option<&PointId>) -> Option<String> {
        match point_id?.point_id_options.as_ref()? {
            qdrant::point_id::PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
            qdrant::point_id::PointIdOptions::Num(num) => Some(num.to_string()),
        }
    }

    fn payload(record: &IndexedRecord) -> HashMap<String, QdrantValue> {
        let metadata = record
            .document
            .metadata
            .iter()
            .filter_map(|(k, v)| json_to_qdrant_value(v.to_json()).map(|v| (k.clone(), v)))
            .collect();

        HashMap::from([
            (
                DOCUMENT_ID_KEY.to_string(),
                QdrantValue::from(record.id().as_str().to_string()),
            ),
            (
                TEXT_KEY.to_string(),
                QdrantValue::from(record.document.content.clone()),
            ),
            (
                METADATA_KEY.to_string(),
                QdrantValue {
                    kind: Some(Kind::StructValue(qdrant::Struct { fields: metadata })),
                },
            ),
        ])
    }

    fn document_from_payload(
        point_id: Option<&PointId>,
        mut payload: HashMap<String, QdrantValue>,
    ) -> VectorResult<Document> {
        let id = match payload.remove(DOCUMENT_ID_KEY).and_then(qdrant_value_to_json) {
            Some(serde_json::Value::String(id)) => id,
            _ => Self::point_id_string(point_id)
                .ok_or_else(|| VectorError::Internal("Missing point ID".to_string()))?,
        };

        let content = match payload.remove(TEXT_KEY).and_then(qdrant_value_to_json) {
            Some(serde_json::Value::String(text)) => text,
            _ => String::new(),
        };

        let metadata = payload
            .remove(METADATA_KEY)
            .and_then(qdrant_value_to_json)
            .map(|m| Document::metadata_from_json(&m))
            .unwrap_or_default();

        Ok(Document {
            id: DocumentId::new(id),
            content,
            metadata,
        })
    }

    /// A missing collection comes back as gRPC NOT_FOUND
    fn map_err(index: &str) -> impl Fn(QdrantError) -> VectorError + '_ {
        move |err| match &err {
            QdrantError::ResponseError { status } if i32::from(status.code()) == 5 => {
                VectorError::IndexNotFound(index.to_string())
            }
            _ => VectorError::from(err),
        }
    }

    fn index_from_info(name: &str, info: &qdrant::CollectionInfo) -> VectorResult<Index> {
        let config = info.config.as_ref();
        let (dimension, distance) = config
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|vc| match &vc.config {
                Some(qdrant::vectors_config::Config::Params(p)) => {
                    Some((p.size as usize, Self::from_qdrant_distance(p.distance())))
                }
                // Named vectors: the first entry is the one this client writes
                Some(qdrant::vectors_config::Config::ParamsMap(map)) => map
                    .map
                    .values()
                    .next()
                    .map(|p| (p.size as usize, Self::from_qdrant_distance(p.distance()))),
                None => None,
            })
            .ok_or_else(|| {
                VectorError::backend(format!("Collection '{}' has no vector parameters", name))
            })?;

        let hnsw = config.and_then(|c| c.hnsw_config.as_ref()).map(|h| {
            let defaults = HnswConfig::default();
            HnswConfig {
                m: h.m.map_or(defaults.m, |m| m as u32),
                ef_construction: h
                    .ef_construct
                    .map_or(defaults.ef_construction, |ef| ef as u32),
                ef_search: defaults.ef_search,
            }
        });

        Ok(Index::new(
            name,
            IndexConfig {
                dimension,
                engine: AnnEngine::Hnsw,
                distance,
                hnsw,
            },
        ))
    }

    fn check_dimension(name: &str, existing: Index, requested: usize) -> VectorResult<Index> {
        if existing.dimension() != requested {
            return Err(VectorError::IndexDimensionConflict {
                index: name.to_string(),
                existing: existing.dimension(),
                requested,
            });
        }
        Ok(existing)
    }
}

fn json_to_qdrant_value(val: serde_json::Value) -> Option<QdrantValue> {
    match val {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(QdrantValue::from(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(QdrantValue::from(i))
            } else {
                n.as_f64().map(QdrantValue::from)
            }
        }
        serde_json::Value::String(s) => Some(QdrantValue::from(s)),
        // Metadata is scalar-only
        _ => None,
    }
}

fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    match val.kind {
        Some(Kind::NullValue(_)) => Some(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => Some(serde_json::Value::Bool(b)),
        Some(Kind::IntegerValue(i)) => Some(serde_json::Value::Number(i.into())),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        Some(Kind::StringValue(s)) => Some(serde_json::Value::String(s)),
        Some(Kind::StructValue(s)) => Some(serde_json::Value::Object(
            s.fields
                .into_iter()
                .filter_map(|(k, v)| qdrant_value_to_json(v).map(|v| (k, v)))
                .collect(),
        )),
        _ => None,
    }
}

#[async_trait]
impl VectorIndexClient for QdrantIndexClient {
    async fn ensure_index(&self, name: &str, config: IndexConfig) -> VectorResult<Index> {
        config.validate()?;

        if let Some(existing) = self.get_index(name).await? {
            return Self::check_dimension(name, existing, config.dimension);
        }

        let mut builder = CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
            config.dimension as u64,
            Self::to_qdrant_distance(config.distance),
        ));

        if let Some(hnsw) = &config.hnsw {
            let hnsw_config = qdrant::HnswConfigDiff {
                m: Some(hnsw.m as u64),
                ef_construct: Some(hnsw.ef_construction as u64),
                ..Default::default()
            };
            builder = builder.hnsw_config(hnsw_config);
        }

        match self.client.create_collection(builder).await {
            Ok(_) => {
                info!(index = %name, dimension = config.dimension, "Created Qdrant collection");
                Ok(Index::new(name, IndexConfig { engine: AnnEngine::Hnsw, ..config }))
            }
            Err(err) => {
                // A concurrent creator may have won; its definition stands
                match self.get_index(name).await? {
                    Some(existing) => {
                        debug!(index = %name, "Collection created concurrently");
                        Self::check_dimension(name, existing, config.dimension)
                    }
                    None => Err(err.into()),
                }
            }
        }
    }

    async fn get_index(&self, name: &str) -> VectorResult<Option<Index>> {
        if !self.client.collection_exists(name).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(name).await.map_err(Self::map_err(name))?;
        let result = info
            .result
            .ok_or_else(|| VectorError::Internal("Collection info missing result".to_string()))?;

        Self::index_from_info(name, &result).map(Some)
    }

    async fn delete_index(&self, name: &str) -> VectorResult<bool> {
        if !self.client.collection_exists(name).await? {
            return Ok(false);
        }
        self.client.delete_collection(name).await?;
        Ok(true)
    }

    async fn bulk_upsert(&self, index: &Index, records: &[IndexedRecord]) -> VectorResult<BulkResult> {
        check_records(index, records)?;
        if records.is_empty() {
            return Ok(BulkResult::default());
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|r| {
                PointStruct::new(
                    Self::point_id(r.id()),
                    r.vector.as_slice().to_vec(),
                    Self::payload(r),
                )
            })
            .collect();

        // Qdrant applies a batch atomically and does not distinguish inserts from updates
        self.client
            .upsert_points(UpsertPointsBuilder::new(&index.name, points).wait(true))
            .await
            .map_err(Self::map_err(&index.name))?;

        Ok(BulkResult::new(
            records.iter().map(|r| BulkItem::created(r.id().clone())).collect(),
        ))
    }

    async fn search(&self, index: &Index, vector: &[f32], k: usize) -> VectorResult<Vec<SearchResult>> {
        index.check_dimension(vector.len(), None)?;
        if k == 0 {
            return Ok(vec![]);
        }

        let builder = SearchPointsBuilder::new(&index.name, vector.to_vec(), k as u64).with_payload(true);
        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(Self::map_err(&index.name))?;

        let distance = index.distance();
        results
            .result
            .into_iter()
            .map(|point| {
                Ok(SearchResult {
                    score: Self::similarity_from_score(distance, point.score),
                    document: Self::document_from_payload(point.id.as_ref(), point.payload)?,
                })
            })
            .collect()
    }

    async fn get_documents(&self, index: &Index, ids: &[DocumentId]) -> VectorResult<Vec<Document>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let point_ids: Vec<PointId> = ids.iter().map(Self::point_id).collect();
        let results = self
            .client
            .get_points(GetPointsBuilder::new(&index.name, point_ids).with_payload(true))
            .await
            .map_err(Self::map_err(&index.name))?;

        results
            .result
            .into_iter()
            .map(|point| Self::document_from_payload(point.id.as_ref(), point.payload))
            .collect()
    }

    async fn count(&self, index: &Index) -> VectorResult<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&index.name).exact(true))
            .await
            .map_err(Self::map_err(&index.name))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmbeddingVector;

    #[test]
    fn test_point_id_is_stable_per_document() {
        let a = QdrantIndexClient::point_id(&DocumentId::from("doc-1"));
        let b = QdrantIndexClient::point_id(&DocumentId::from("doc-1"));
        let c = QdrantIndexClient::point_id(&DocumentId::from("doc-2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_payload_roundtrip_keeps_id_and_metadata() {
        let document = Document::with_id("q2", "If you want to live a happy life, tie it to a goal.")
            .with_metadata("author", "A. Einstein")
            .with_metadata("year", 1950i64);
        let record = IndexedRecord::new(document.clone(), EmbeddingVector::new(vec![0.0; 4]), 4).unwrap();

        let payload = QdrantIndexClient::payload(&record);
        let back = QdrantIndexClient::document_from_payload(None, payload).unwrap();

        assert_eq!(back, document);
    }

    #[test]
    fn test_euclidean_distance_becomes_similarity() {
        let score = QdrantIndexClient::similarity_from_score(DistanceMetric::Euclidean, 2.0);
        assert!((score - 0.2).abs() < 1e-6);
        assert_eq!(
            QdrantIndexClient::similarity_from_score(DistanceMetric::Cosine, 0.9),
            0.9
        );
    }
}
