use async_trait::async_trait;
use core_config::{env_or_default, env_parse};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::http::{build_client, status_error, transport_error};
use super::{EmbeddingOptions, EmbeddingProvider};
use crate::error::{VectorError, VectorResult};
use crate::models::EmbeddingProviderType;

/// Text Embeddings Inference server configuration
#[derive(Debug, Clone)]
pub struct TeiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl TeiConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn from_env() -> VectorResult<Self> {
        let url = env_or_default("TEI_URL", "http://localhost:8080");
        let timeout_secs = env_parse("TEI_TIMEOUT_SECS", 30u64)?;
        Ok(Self::new(url).with_timeout(timeout_secs))
    }
}

impl Default for TeiConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Hugging Face Text Embeddings Inference provider.
///
/// The server is started with a fixed model, so `options.model` only labels
/// the request in logs; the generator still checks the returned dimension.
pub struct TeiProvider {
    client: Client,
    config: TeiConfig,
}

impl TeiProvider {
    pub fn new(config: TeiConfig) -> VectorResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(TeiConfig::from_env()?)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
    truncate: bool,
}

#[async_trait]
impl EmbeddingProvider for TeiProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Tei
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> VectorResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(
            model = %options.model,
            device = %options.device,
            texts = texts.len(),
            "Requesting TEI embeddings"
        );

        let response = self
            .client
            .post(format!("{}/embed", self.config.url))
            .json(&EmbedRequest {
                inputs: texts,
                normalize: options.normalize,
                truncate: true,
            })
            .send()
            .await
            .map_err(|e| transport_error("TEI", e))?;

        if !response.status().is_success() {
            return Err(status_error("TEI", response).await);
        }

        response
            .json::<Vec<Vec<f32>>>()
            .await
            .map_err(|e| VectorError::Embedding(format!("TEI returned an unreadable body: {}", e)))
    }
}
