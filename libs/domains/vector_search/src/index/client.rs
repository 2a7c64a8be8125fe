use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{BulkResult, Document, DocumentId, Index, IndexConfig, IndexedRecord, SearchResult};

/// Contract over a vector store backend
///
/// Implementations must keep scores on the "higher is more similar" scale
/// described on [`crate::models::DistanceMetric`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Create the index if absent, otherwise verify its dimension.
    ///
    /// Concurrent callers resolve to one definition; a caller whose dimension
    /// differs from the winner's gets `IndexDimensionConflict`.
    async fn ensure_index(&self, name: &str, config: IndexConfig) -> VectorResult<Index>;

    /// Look up an existing index
    async fn get_index(&self, name: &str) -> VectorResult<Option<Index>>;

    /// Drop an index, returning whether it existed
    async fn delete_index(&self, name: &str) -> VectorResult<bool>;

    /// Insert or replace records by document id, reporting per-record outcomes
    async fn bulk_upsert(&self, index: &Index, records: &[IndexedRecord]) -> VectorResult<BulkResult>;

    /// Top-k nearest neighbours of `vector`, best first
    async fn search(&self, index: &Index, vector: &[f32], k: usize) -> VectorResult<Vec<SearchResult>>;

    /// Fetch stored documents by id, skipping unknown ids
    async fn get_documents(&self, index: &Index, ids: &[DocumentId]) -> VectorResult<Vec<Document>>;

    /// Number of records in the index
    async fn count(&self, index: &Index) -> VectorResult<u64>;
}

/// Validation shared by every backend before a write leaves the process
pub(crate) fn check_records(index: &Index, records: &[IndexedRecord]) -> VectorResult<()> {
    records
        .iter()
        .try_for_each(|record| index.check_dimension(record.vector.dimension(), Some(record.id())))
}
