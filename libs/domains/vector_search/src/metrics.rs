//! Ingestion metrics
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! binary installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metrics helper labelled with the target index
#[derive(Clone)]
pub struct IngestMetrics {
    index: String,
}

impl IngestMetrics {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    /// Record a batch whose documents are all durable
    pub fn batch_committed(&self, documents: usize, duration: Duration) {
        counter!(
            "vector_ingest_batches_total",
            "index" => self.index.clone(),
            "status" => "committed"
        )
        .increment(1);

        counter!(
            "vector_ingest_documents_total",
            "index" => self.index.clone(),
            "status" => "committed"
        )
        .increment(documents as u64);

        histogram!(
            "vector_ingest_batch_duration_seconds",
            "index" => self.index.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a batch that ended with unconfirmed documents
    pub fn batch_failed(&self, documents: usize, duration: Duration) {
        counter!(
            "vector_ingest_batches_total",
            "index" => self.index.clone(),
            "status" => "failed"
        )
        .increment(1);

        counter!(
            "vector_ingest_documents_total",
            "index" => self.index.clone(),
            "status" => "failed"
        )
        .increment(documents as u64);

        histogram!(
            "vector_ingest_batch_duration_seconds",
            "index" => self.index.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn batch_retried(&self) {
        counter!("vector_ingest_retries_total", "index" => self.index.clone()).increment(1);
    }
}
