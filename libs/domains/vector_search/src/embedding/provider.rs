use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{Device, EmbeddingModel, EmbeddingProviderType};

/// Per-request settings forwarded to an embedding provider
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOptions {
    pub model: EmbeddingModel,
    pub normalize: bool,
    pub device: Device,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::default(),
            normalize: false,
            device: Device::Cpu,
        }
    }
}

/// Trait for embedding generation providers
///
/// Implementations return one vector per input text, in input order.
/// Length and count checks are left to `EmbeddingGenerator`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> EmbeddingProviderType;

    /// Generate embeddings for multiple texts in one request
    async fn embed_batch(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> VectorResult<Vec<Vec<f32>>>;
}
