use std::sync::Arc;

use tracing::{debug, instrument};

use super::{EmbeddingConfig, EmbeddingOptions, EmbeddingProvider};
use crate::error::{VectorError, VectorResult};
use crate::models::{EmbeddingProviderType, EmbeddingVector};

/// Turns text into vectors of the configured model's dimension.
///
/// One generator serves both ingestion and queries so both sides see the
/// same model and normalisation.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingConfig,
    options: EmbeddingOptions,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: EmbeddingConfig) -> Self {
        let options = EmbeddingOptions {
            model: config.model.clone(),
            normalize: config.normalize_embeddings,
            device: config.device,
        };
        Self {
            provider,
            config,
            options,
        }
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension()
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn provider_type(&self) -> EmbeddingProviderType {
        self.provider.provider_type()
    }

    /// Embed `texts`, one vector per text in the same order
    #[instrument(skip(self, texts), fields(texts = texts.len(), model = %self.config.model))]
    pub async fn embed(&self, texts: &[String]) -> VectorResult<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        let chunk_size = self.config.max_batch_size.max(1);

        for chunk in texts.chunks(chunk_size) {
            let raw = self.provider.embed_batch(chunk, &self.options).await?;
            if raw.len() != chunk.len() {
                return Err(VectorError::Embedding(format!(
                    "Provider returned {} vectors for {} texts",
                    raw.len(),
                    chunk.len()
                )));
            }

            for values in raw {
                let position = vectors.len();
                if values.len() != self.dimension() {
                    return Err(VectorError::EmbeddingDimensionMismatch {
                        expected: self.dimension(),
                        actual: values.len(),
                        position,
                    });
                }

                let vector = EmbeddingVector::new(values);
                vectors.push(if self.config.normalize_embeddings {
                    vector.normalized()
                } else {
                    vector
                });
            }
        }

        debug!(vectors = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    pub async fn embed_one(&self, text: &str) -> VectorResult<EmbeddingVector> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::Embedding("No embedding returned".to_string()))
    }
}
