use std::sync::Arc;

use tracing::{debug, instrument};

use crate::embedding::EmbeddingGenerator;
use crate::error::{QueryStage, VectorError, VectorResult};
use crate::index::VectorIndexClient;
use crate::models::{Index, SearchResult};

/// Embeds query text and asks the index for its nearest neighbours
pub struct QueryEngine<C: VectorIndexClient + ?Sized> {
    client: Arc<C>,
    generator: Arc<EmbeddingGenerator>,
}

impl<C: VectorIndexClient + ?Sized> QueryEngine<C> {
    pub fn new(client: Arc<C>, generator: Arc<EmbeddingGenerator>) -> Self {
        Self { client, generator }
    }

    /// Top-k documents for `text`, best first.
    ///
    /// Errors are wrapped in [`VectorError::Query`] naming the failing stage.
    #[instrument(skip_all, fields(index = %index.name, k = k))]
    pub async fn query(&self, index: &Index, text: &str, k: usize) -> VectorResult<Vec<SearchResult>> {
        let vector = self
            .generator
            .embed_one(text)
            .await
            .map_err(|e| VectorError::query(QueryStage::Embedding, e))?;

        let results = self
            .client
            .search(index, vector.as_slice(), k)
            .await
            .map_err(|e| VectorError::query(QueryStage::Search, e))?;

        debug!(hits = results.len(), "Query answered");
        Ok(results)
    }

    /// Like [`QueryEngine::query`], resolving the index by name first
    pub async fn query_by_name(&self, name: &str, text: &str, k: usize) -> VectorResult<Vec<SearchResult>> {
        let index = self
            .client
            .get_index(name)
            .await
            .map_err(|e| VectorError::query(QueryStage::Search, e))?
            .ok_or_else(|| {
                VectorError::query(QueryStage::Search, VectorError::IndexNotFound(name.to_string()))
            })?;

        self.query(&index, text, k).await
    }
}
