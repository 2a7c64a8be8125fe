use crate::error::{VectorError, VectorResult};
use crate::models::{DocumentId, Index};

/// A batch that did not commit, with the ids that are unconfirmed
#[derive(Debug)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub document_ids: Vec<DocumentId>,
    pub error: VectorError,
}

/// Outcome of an ingestion run
///
/// Every document pulled from the source appears exactly once, either in
/// `committed` or in one failure's `document_ids`.
#[derive(Debug, Default)]
pub struct IngestionReport {
    /// Target index, `None` when the source was empty
    pub index: Option<Index>,
    /// Batches pulled from the source
    pub batches: usize,
    pub committed: Vec<DocumentId>,
    /// Failed batches ordered by batch index
    pub failures: Vec<BatchFailure>,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

impl IngestionReport {
    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<DocumentId> {
        self.failures
            .iter()
            .flat_map(|f| f.document_ids.iter().cloned())
            .collect()
    }

    /// The report itself, or the first failed batch as an error
    pub fn into_result(mut self) -> VectorResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(self.failures.swap_remove(0).error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(batch_index: usize, ids: &[&str]) -> BatchFailure {
        BatchFailure {
            batch_index,
            document_ids: ids.iter().map(|id| DocumentId::from(*id)).collect(),
            error: VectorError::BatchIngestionFailed {
                batch_index,
                document_ids: ids.iter().map(|id| DocumentId::from(*id)).collect(),
                attempts: 4,
                reason: "unavailable".into(),
            },
        }
    }

    #[test]
    fn test_into_result_returns_first_failure() {
        let report = IngestionReport {
            batches: 3,
            committed: vec!["a".into()],
            failures: vec![failure(1, &["b"]), failure(2, &["c"])],
            ..Default::default()
        };

        assert_eq!(report.failed_ids(), vec![DocumentId::from("b"), DocumentId::from("c")]);

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, VectorError::BatchIngestionFailed { batch_index: 1, .. }));
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = IngestionReport::default().into_result().unwrap();
        assert!(report.index.is_none());
        assert_eq!(report.committed_count(), 0);
    }
}
