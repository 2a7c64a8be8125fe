use std::time::Duration;

use core_config::{env_or_default, env_parse};

use super::RetryPolicy;
use crate::error::{VectorError, VectorResult};
use crate::models::{AnnEngine, DistanceMetric, HnswConfig, IndexConfig};

pub const DEFAULT_INDEX_NAME: &str = "vector";
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Batch ingestion configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    pub index_name: String,
    /// Maximum documents per bulk write
    pub batch_size: usize,
    /// Maximum batches held in memory and in flight at once
    pub max_in_flight: usize,
    pub engine: AnnEngine,
    pub distance: DistanceMetric,
    pub hnsw: Option<HnswConfig>,
    pub retry: RetryPolicy,
}

impl IngestionConfig {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_engine(mut self, engine: AnnEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_hnsw(mut self, hnsw: Option<HnswConfig>) -> Self {
        self.hnsw = hnsw;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Index definition for vectors of `dimension`
    pub fn index_config(&self, dimension: usize) -> IndexConfig {
        IndexConfig {
            dimension,
            engine: self.engine,
            distance: self.distance,
            hnsw: self.hnsw,
        }
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.index_name.trim().is_empty() {
            return Err(VectorError::Config("Index name must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(VectorError::Config(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(VectorError::Config(
                "At least one batch must be allowed in flight".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads `VECTOR_INDEX_NAME`, `VECTOR_INDEX_ENGINE`, `VECTOR_INDEX_DISTANCE`,
    /// `INGEST_BATCH_SIZE`, `INGEST_MAX_IN_FLIGHT`, `INGEST_MAX_RETRIES`,
    /// `INGEST_RETRY_BASE_MS` and `INGEST_RETRY_MAX_MS`
    pub fn from_env() -> VectorResult<Self> {
        let defaults = Self::default();
        let retry = RetryPolicy {
            max_retries: env_parse("INGEST_MAX_RETRIES", defaults.retry.max_retries)?,
            base_delay: Duration::from_millis(env_parse(
                "INGEST_RETRY_BASE_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(env_parse(
                "INGEST_RETRY_MAX_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )?),
        };

        let config = Self {
            index_name: env_or_default("VECTOR_INDEX_NAME", DEFAULT_INDEX_NAME),
            batch_size: env_parse("INGEST_BATCH_SIZE", defaults.batch_size)?,
            max_in_flight: env_parse("INGEST_MAX_IN_FLIGHT", defaults.max_in_flight)?,
            engine: env_parse("VECTOR_INDEX_ENGINE", defaults.engine)?,
            distance: env_parse("VECTOR_INDEX_DISTANCE", defaults.distance)?,
            hnsw: defaults.hnsw,
            retry,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: 4,
            engine: AnnEngine::Faiss,
            distance: DistanceMetric::Cosine,
            hnsw: Some(HnswConfig::default()),
            retry: RetryPolicy::default(),
        }
    }
}
