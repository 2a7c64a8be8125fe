use core_config::{env_flag, env_parse};

use crate::error::{VectorError, VectorResult};
use crate::models::{Device, EmbeddingModel, EmbeddingProviderType};

/// Embedding generator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,
    pub model: EmbeddingModel,
    /// L2-normalise every vector, for ingestion and queries alike
    pub normalize_embeddings: bool,
    pub device: Device,
    /// Upper bound on texts per provider request
    pub max_batch_size: usize,
}

impl EmbeddingConfig {
    pub fn new(provider: EmbeddingProviderType, model: EmbeddingModel) -> Self {
        Self {
            provider,
            model,
            ..Default::default()
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize_embeddings = normalize;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// Reads `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`, `EMBEDDING_NORMALIZE`,
    /// `EMBEDDING_DEVICE` and `EMBEDDING_BATCH_SIZE`
    pub fn from_env() -> VectorResult<Self> {
        let defaults = Self::default();
        let config = Self {
            provider: env_parse("EMBEDDING_PROVIDER", defaults.provider)?,
            model: env_parse("EMBEDDING_MODEL", defaults.model)?,
            normalize_embeddings: env_flag("EMBEDDING_NORMALIZE", defaults.normalize_embeddings)?,
            device: env_parse("EMBEDDING_DEVICE", defaults.device)?,
            max_batch_size: env_parse("EMBEDDING_BATCH_SIZE", defaults.max_batch_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.max_batch_size == 0 {
            return Err(VectorError::Config(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }
        if self.dimension() == 0 {
            return Err(VectorError::Config(format!(
                "Model '{}' has no output dimension",
                self.model
            )));
        }
        Ok(())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Local,
            model: EmbeddingModel::AllMiniLmL6V2,
            normalize_embeddings: false,
            device: Device::Cpu,
            max_batch_size: 32,
        }
    }
}
