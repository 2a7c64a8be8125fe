use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbeddingOptions, EmbeddingProvider};
use crate::error::{VectorError, VectorResult};
use crate::models::EmbeddingProviderType;

/// Deterministic in-process embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `model.dimension()` buckets with a hash-derived sign, giving a signed
/// bag-of-words vector. Texts that share words score higher under cosine,
/// which is enough for smoke runs and tests without a model server.
#[derive(Debug, Clone, Default)]
pub struct HashingProvider;

impl HashingProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
        let mut vector = vec![0.0f32; dimension];
        if dimension == 0 {
            return vector;
        }

        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Local
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> VectorResult<Vec<Vec<f32>>> {
        let dimension = options.model.dimension();
        if dimension == 0 {
            return Err(VectorError::Config(
                "Hashing embedder needs a model with a non-zero dimension".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| Self::embed_text(text, dimension))
            .collect())
    }
}
