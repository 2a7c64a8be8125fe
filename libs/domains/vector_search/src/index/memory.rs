use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{check_records, VectorIndexClient};
use crate::error::{VectorError, VectorResult};
use crate::models::{
    BulkItem, BulkResult, Document, DocumentId, EmbeddingVector, Index, IndexConfig, IndexedRecord,
    SearchResult,
};

struct StoredRecord {
    document: Document,
    vector: EmbeddingVector,
    seq: u64,
}

struct MemoryIndex {
    index: Index,
    records: HashMap<DocumentId, StoredRecord>,
    next_seq: u64,
}

/// Exact, in-process index
///
/// Search scans every record, so it is only meant for tests and small corpora.
/// Ties are broken by the order in which ids were first written.
#[derive(Default)]
pub struct InMemoryIndexClient {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryIndexClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> VectorResult<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryIndex>>> {
        self.indexes
            .read()
            .map_err(|_| VectorError::Internal("In-memory index lock poisoned".to_string()))
    }

    fn write(&self) -> VectorResult<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryIndex>>> {
        self.indexes
            .write()
            .map_err(|_| VectorError::Internal("In-memory index lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorIndexClient for InMemoryIndexClient {
    async fn ensure_index(&self, name: &str, config: IndexConfig) -> VectorResult<Index> {
        config.validate()?;
        let mut indexes = self.write()?;

        if let Some(existing) = indexes.get(name) {
            if existing.index.dimension() != config.dimension {
                return Err(VectorError::IndexDimensionConflict {
                    index: name.to_string(),
                    existing: existing.index.dimension(),
                    requested: config.dimension,
                });
            }
            return Ok(existing.index.clone());
        }

        let index = Index::new(name, config);
        indexes.insert(
            name.to_string(),
            MemoryIndex {
                index: index.clone(),
                records: HashMap::new(),
                next_seq: 0,
            },
        );
        info!(index = %name, dimension = index.dimension(), "Created in-memory index");
        Ok(index)
    }

    async fn get_index(&self, name: &str) -> VectorResult<Option<Index>> {
        Ok(self.read()?.get(name).map(|m| m.index.clone()))
    }

    async fn delete_index(&self, name: &str) -> VectorResult<bool> {
        Ok(self.write()?.remove(name).is_some())
    }

    async fn bulk_upsert(&self, index: &Index, records: &[IndexedRecord]) -> VectorResult<BulkResult> {
        let mut indexes = self.write()?;
        let stored = indexes
            .get_mut(&index.name)
            .ok_or_else(|| VectorError::IndexNotFound(index.name.clone()))?;
        // The handle may predate a delete and recreate under the same name
        check_records(&stored.index, records)?;

        let items = records
            .iter()
            .map(|record| {
                let id = record.id().clone();
                match stored.records.get_mut(&id) {
                    Some(existing) => {
                        existing.document = record.document.clone();
                        existing.vector = record.vector.clone();
                        BulkItem::updated(id)
                    }
                    None => {
                        let seq = stored.next_seq;
                        stored.next_seq += 1;
                        stored.records.insert(
                            id.clone(),
                            StoredRecord {
                                document: record.document.clone(),
                                vector: record.vector.clone(),
                                seq,
                            },
                        );
                        BulkItem::created(id)
                    }
                }
            })
            .collect();

        debug!(index = %index.name, records = records.len(), "Upserted records");
        Ok(BulkResult::new(items))
    }

    async fn search(&self, index: &Index, vector: &[f32], k: usize) -> VectorResult<Vec<SearchResult>> {
        let indexes = self.read()?;
        let stored = indexes
            .get(&index.name)
            .ok_or_else(|| VectorError::IndexNotFound(index.name.clone()))?;
        stored.index.check_dimension(vector.len(), None)?;

        if k == 0 {
            return Ok(vec![]);
        }

        let metric = stored.index.distance();
        let mut scored: Vec<(f32, u64, &StoredRecord)> = stored
            .records
            .values()
            .map(|r| (metric.similarity(vector, r.vector.as_slice()), r.seq, r))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, _, r)| SearchResult {
                document: r.document.clone(),
                score,
            })
            .collect())
    }

    async fn get_documents(&self, index: &Index, ids: &[DocumentId]) -> VectorResult<Vec<Document>> {
        let indexes = self.read()?;
        let stored = indexes
            .get(&index.name)
            .ok_or_else(|| VectorError::IndexNotFound(index.name.clone()))?;

        Ok(ids
            .iter()
            .filter_map(|id| stored.records.get(id).map(|r| r.document.clone()))
            .collect())
    }

    async fn count(&self, index: &Index) -> VectorResult<u64> {
        let indexes = self.read()?;
        let stored = indexes
            .get(&index.name)
            .ok_or_else(|| VectorError::IndexNotFound(index.name.clone()))?;
        Ok(stored.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{AnnEngine, DistanceMetric};

    fn config(dimension: usize) -> IndexConfig {
        IndexConfig::new(dimension).with_engine(AnnEngine::Exact)
    }

    fn record(id: &str, content: &str, vector: Vec<f32>) -> IndexedRecord {
        let dim = vector.len();
        IndexedRecord::new(Document::with_id(id, content), EmbeddingVector::new(vector), dim).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent_for_same_dimension() {
        let client = InMemoryIndexClient::new();
        let first = client.ensure_index("docs", config(3)).await.unwrap();
        let second = client.ensure_index("docs", config(3)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_ensure_index_rejects_other_dimension() {
        let client = InMemoryIndexClient::new();
        client.ensure_index("x", config(384)).await.unwrap();

        let err = client.ensure_index("x", config(768)).await.unwrap_err();
        assert!(matches!(
            err,
            VectorError::IndexDimensionConflict {
                existing: 384,
                requested: 768,
                ..
            }
        ));

        let index = client.get_index("x").await.unwrap().unwrap();
        assert_eq!(index.dimension(), 384);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_index_has_one_winner() {
        let client = Arc::new(InMemoryIndexClient::new());
        let mut handles = Vec::new();
        for dim in [4usize, 8, 4, 8, 4, 8] {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                client.ensure_index("race", config(dim)).await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(index) => winners.push(index.dimension()),
                Err(e) => assert!(matches!(e, VectorError::IndexDimensionConflict { .. })),
            }
        }

        let stored = client.get_index("race").await.unwrap().unwrap().dimension();
        assert!(!winners.is_empty());
        assert!(winners.iter().all(|d| *d == stored));
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_keeps_first_sequence() {
        let client = InMemoryIndexClient::new();
        let index = client.ensure_index("docs", config(2)).await.unwrap();

        let result = client
            .bulk_upsert(&index, &[record("a", "one", vec![1.0, 0.0]), record("b", "two", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert!(result.is_success());

        let result = client
            .bulk_upsert(&index, &[record("a", "uno", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(result.items[0], BulkItem::updated("a".into()));
        assert_eq!(client.count(&index).await.unwrap(), 2);

        // Equal scores: "a" was written first and stays first after the update
        let hits = client.search(&index, &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].document.id.as_str(), "a");
        assert_eq!(hits[0].document.content, "uno");
        assert_eq!(hits[1].document.id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let client = InMemoryIndexClient::new();
        let index = client
            .ensure_index("docs", config(2).with_distance(DistanceMetric::Euclidean))
            .await
            .unwrap();
        client
            .bulk_upsert(
                &index,
                &[
                    record("far", "far", vec![5.0, 5.0]),
                    record("near", "near", vec![1.0, 1.0]),
                    record("exact", "exact", vec![0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = client.search(&index, &[0.0, 0.0], 2).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert_eq!(hits[0].score, 1.0);
        assert!((hits[1].score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_validates_query() {
        let client = InMemoryIndexClient::new();
        let index = client.ensure_index("docs", config(3)).await.unwrap();

        let err = client.search(&index, &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { expected: 3, actual: 1, .. }));

        assert!(client.search(&index, &[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());

        let missing = Index::new("missing", config(3));
        let err = client.search(&missing, &[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorError::IndexNotFound(ref name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension_before_writing() {
        let client = InMemoryIndexClient::new();
        let index = client.ensure_index("docs", config(3)).await.unwrap();

        let err = client
            .bulk_upsert(&index, &[record("ok", "ok", vec![1.0, 0.0, 0.0]), record("bad", "bad", vec![1.0])])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VectorError::DimensionMismatch { document_id: Some(ref id), .. } if id.as_str() == "bad"
        ));
        assert_eq!(client.count(&index).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_through_stale_handle_checks_current_dimension() {
        let client = InMemoryIndexClient::new();
        let stale = client.ensure_index("x", config(2)).await.unwrap();
        assert!(client.delete_index("x").await.unwrap());
        let current = client.ensure_index("x", config(3)).await.unwrap();

        let err = client
            .bulk_upsert(&stale, &[record("a", "two dims", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorError::DimensionMismatch { expected: 3, actual: 2, document_id: Some(ref id) } if id.as_str() == "a"
        ));
        assert_eq!(client.count(&current).await.unwrap(), 0);
        assert!(client.search(&current, &[1.0, 0.0, 0.0], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_documents_skips_unknown_ids() {
        let client = InMemoryIndexClient::new();
        let index = client.ensure_index("docs", config(2)).await.unwrap();
        client
            .bulk_upsert(&index, &[record("a", "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();

        let docs = client
            .get_documents(&index, &["a".into(), "zzz".into()])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "alpha");

        assert!(client.delete_index("docs").await.unwrap());
        assert!(!client.delete_index("docs").await.unwrap());
    }
}
