use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::error::{VectorError, VectorResult};

/// Opaque document identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered identifier for documents that arrive without one
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Scalar metadata value attached to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Convert a JSON scalar; arrays, objects and null have no metadata form
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetadataValue::Integer)
                .or_else(|| n.as_f64().map(MetadataValue::Float)),
            serde_json::Value::String(s) => Some(MetadataValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Bool(b) => serde_json::Value::Bool(*b),
            MetadataValue::Integer(i) => serde_json::Value::from(*i),
            MetadataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetadataValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// A text document with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "DocumentId::generate")]
    pub id: DocumentId,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn metadata_from_json(value: &serde_json::Value) -> Metadata {
        match value {
            serde_json::Value::Object(map) => map
                .iter()
                .filter_map(|(k, v)| MetadataValue::from_json(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => Metadata::new(),
        }
    }
}

/// Fixed-length embedding produced by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Unit-length copy; a zero vector stays zero
    pub fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > f32::EPSILON {
            self.0.iter_mut().for_each(|v| *v /= norm);
        }
        self
    }

    pub fn is_normalized(&self) -> bool {
        (self.norm() - 1.0).abs() < 1e-4
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Similarity metric for an index.
///
/// Scores are always "higher is more similar": cosine similarity for `Cosine`,
/// the raw inner product for `DotProduct` and `1 / (1 + d²)` for `Euclidean`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl DistanceMetric {
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let dot = dot(a, b);
                let norms = dot_self(a).sqrt() * dot_self(b).sqrt();
                if norms <= f32::EPSILON {
                    0.0
                } else {
                    dot / norms
                }
            }
            DistanceMetric::DotProduct => dot(a, b),
            DistanceMetric::Euclidean => {
                let squared: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                Self::euclidean_score(squared)
            }
        }
    }

    /// Map a squared euclidean distance onto the shared score scale
    pub fn euclidean_score(squared_distance: f32) -> f32 {
        1.0 / (1.0 + squared_distance)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn dot_self(a: &[f32]) -> f32 {
    dot(a, a)
}

/// Approximate nearest-neighbor engine backing an index
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AnnEngine {
    /// OpenSearch k-NN with the FAISS library
    #[default]
    Faiss,
    /// OpenSearch k-NN with Lucene's native HNSW
    Lucene,
    /// OpenSearch k-NN with NMSLIB
    Nmslib,
    /// Qdrant's HNSW index
    Hnsw,
    /// Exhaustive in-process scan
    Exact,
}

/// HNSW graph parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 512,
            ef_search: 512,
        }
    }
}

/// Shape of an index, fixed at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dimension: usize,
    pub engine: AnnEngine,
    pub distance: DistanceMetric,
    pub hnsw: Option<HnswConfig>,
}

impl IndexConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            engine: AnnEngine::default(),
            distance: DistanceMetric::default(),
            hnsw: None,
        }
    }

    pub fn with_engine(mut self, engine: AnnEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = Some(hnsw);
        self
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.dimension == 0 {
            return Err(VectorError::Validation(
                "Index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named, dimension-fixed index in the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub config: IndexConfig,
}

impl Index {
    pub fn new(name: impl Into<String>, config: IndexConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn engine(&self) -> AnnEngine {
        self.config.engine
    }

    pub fn distance(&self) -> DistanceMetric {
        self.config.distance
    }

    /// Reject vectors whose length differs from the index dimension
    pub fn check_dimension(&self, actual: usize, document_id: Option<&DocumentId>) -> VectorResult<()> {
        if actual != self.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension(),
                actual,
                document_id: document_id.cloned(),
            });
        }
        Ok(())
    }
}

/// A document paired with its embedding, the unit written to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub document: Document,
    pub vector: EmbeddingVector,
}

impl IndexedRecord {
    pub fn new(document: Document, vector: EmbeddingVector, dimension: usize) -> VectorResult<Self> {
        if vector.dimension() != dimension {
            return Err(VectorError::DimensionMismatch {
                expected: dimension,
                actual: vector.dimension(),
                document_id: Some(document.id.clone()),
            });
        }
        Ok(Self { document, vector })
    }

    pub fn id(&self) -> &DocumentId {
        &self.document.id
    }
}

/// A ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Outcome of a single record in a bulk write
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Created,
    Updated,
    Failed {
        code: String,
        reason: String,
        retryable: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    pub id: DocumentId,
    pub outcome: BulkOutcome,
}

impl BulkItem {
    pub fn created(id: DocumentId) -> Self {
        Self {
            id,
            outcome: BulkOutcome::Created,
        }
    }

    pub fn updated(id: DocumentId) -> Self {
        Self {
            id,
            outcome: BulkOutcome::Updated,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, BulkOutcome::Failed { .. })
    }
}

/// A record the backend refused
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    pub id: DocumentId,
    pub code: String,
    pub reason: String,
    pub retryable: bool,
}

impl fmt::Display for BulkItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.id, self.code, self.reason)
    }
}

/// Per-record results of a bulk upsert, in submission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResult {
    pub items: Vec<BulkItem>,
}

impl BulkResult {
    pub fn new(items: Vec<BulkItem>) -> Self {
        Self { items }
    }

    pub fn is_success(&self) -> bool {
        self.items.iter().all(BulkItem::is_success)
    }

    pub fn succeeded_ids(&self) -> Vec<DocumentId> {
        self.items
            .iter()
            .filter(|item| item.is_success())
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn failures(&self) -> Vec<BulkItemFailure> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                BulkOutcome::Failed {
                    code,
                    reason,
                    retryable,
                } => Some(BulkItemFailure {
                    id: item.id.clone(),
                    code: code.clone(),
                    reason: reason.clone(),
                    retryable: *retryable,
                }),
                _ => None,
            })
            .collect()
    }

    /// Collapse per-item failures into a batch-level error
    pub fn into_result(self) -> VectorResult<Self> {
        let failed = self.failures();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(VectorError::BulkRejected { failed })
        }
    }
}

/// Embedding provider types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// Deterministic in-process feature hashing
    #[default]
    Local,
    /// OpenAI-compatible `/embeddings` API
    OpenAI,
    /// Hugging Face Text Embeddings Inference server
    Tei,
}

/// Compute device hint forwarded to the embedding service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

/// Embedding model selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// sentence-transformers/all-MiniLM-L6-v2 (384 dimensions)
    #[default]
    AllMiniLmL6V2,
    /// sentence-transformers/all-mpnet-base-v2 (768 dimensions)
    AllMpnetBaseV2,
    /// OpenAI text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// Any other model with a known output dimension
    Custom { name: String, dimension: usize },
}

impl EmbeddingModel {
    pub fn custom(name: impl Into<String>, dimension: usize) -> Self {
        EmbeddingModel::Custom {
            name: name.into(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingModel::AllMiniLmL6V2 => 384,
            EmbeddingModel::AllMpnetBaseV2 => 768,
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::Custom { dimension, .. } => *dimension,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingModel::AllMiniLmL6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            EmbeddingModel::AllMpnetBaseV2 => "sentence-transformers/all-mpnet-base-v2",
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::Custom { name, .. } => name,
        }
    }

    /// Resolve a catalogue model by full or short name
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.rsplit('/').next().unwrap_or(name);
        let model = match short.to_ascii_lowercase().as_str() {
            "all-minilm-l6-v2" => EmbeddingModel::AllMiniLmL6V2,
            "all-mpnet-base-v2" => EmbeddingModel::AllMpnetBaseV2,
            "text-embedding-3-small" => EmbeddingModel::TextEmbedding3Small,
            "text-embedding-3-large" => EmbeddingModel::TextEmbedding3Large,
            _ => return None,
        };
        Some(model)
    }

    /// Parse `name` or `name:dimension`; unknown names require a dimension
    pub fn parse(value: &str) -> VectorResult<Self> {
        if let Some((name, dim)) = value.rsplit_once(':') {
            let dimension = dim.parse::<usize>().map_err(|e| {
                VectorError::Config(format!("Invalid model dimension '{}': {}", dim, e))
            })?;
            return Ok(match Self::from_name(name) {
                Some(model) if model.dimension() == dimension => model,
                _ => Self::custom(name, dimension),
            });
        }

        Self::from_name(value).ok_or_else(|| {
            VectorError::Config(format!(
                "Unknown embedding model '{}', use '<name>:<dimension>' for custom models",
                value
            ))
        })
    }
}

impl FromStr for EmbeddingModel {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}
