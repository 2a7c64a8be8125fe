mod config;
mod generator;
mod hashing;
mod http;
mod openai;
mod provider;
mod tei;

use std::sync::Arc;

pub use config::EmbeddingConfig;
pub use generator::EmbeddingGenerator;
pub use hashing::HashingProvider;
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use provider::{EmbeddingOptions, EmbeddingProvider};
pub use tei::{TeiConfig, TeiProvider};

#[cfg(test)]
pub use provider::MockEmbeddingProvider;

use crate::error::VectorResult;
use crate::models::EmbeddingProviderType;

/// Build the provider named by `provider_type`, reading its endpoint settings from the environment
pub fn provider_from_env(
    provider_type: EmbeddingProviderType,
) -> VectorResult<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match provider_type {
        EmbeddingProviderType::Local => Arc::new(HashingProvider::new()),
        EmbeddingProviderType::OpenAI => Arc::new(OpenAIProvider::from_env()?),
        EmbeddingProviderType::Tei => Arc::new(TeiProvider::from_env()?),
    };
    Ok(provider)
}
