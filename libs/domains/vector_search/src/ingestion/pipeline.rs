use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::{BatchFailure, IngestionConfig, IngestionReport, RetryPolicy};
use crate::embedding::EmbeddingGenerator;
use crate::error::{VectorError, VectorResult};
use crate::index::VectorIndexClient;
use crate::metrics::IngestMetrics;
use crate::models::{Document, DocumentId, Index, IndexedRecord};

/// Batches documents, embeds them and bulk-writes them into one index.
///
/// Up to `max_in_flight` batches run concurrently; each batch is owned by a
/// single task from embedding to commit. Committed batches stay committed
/// when a later batch fails.
pub struct IngestionPipeline<C: VectorIndexClient + ?Sized> {
    client: Arc<C>,
    generator: Arc<EmbeddingGenerator>,
    config: IngestionConfig,
}

impl<C> IngestionPipeline<C>
where
    C: VectorIndexClient + ?Sized + 'static,
{
    pub fn new(client: Arc<C>, generator: Arc<EmbeddingGenerator>, config: IngestionConfig) -> Self {
        Self {
            client,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Ingest an in-memory or lazily produced sequence of documents
    pub async fn ingest<I>(&self, documents: I) -> VectorResult<IngestionReport>
    where
        I: IntoIterator<Item = Document>,
        I::IntoIter: Send,
    {
        let (_cancel_tx, cancel) = watch::channel(false);
        self.ingest_stream(futures::stream::iter(documents), cancel).await
    }

    /// Ingest documents from a stream until it ends or `cancel` flips to `true`.
    ///
    /// Cancellation stops pulling new batches; batches already pulled finish
    /// or fail and are recorded in the report. Fails outright only when the
    /// configuration is invalid or the index cannot be ensured.
    #[instrument(skip_all, fields(index = %self.config.index_name, batch_size = self.config.batch_size))]
    pub async fn ingest_stream<S>(
        &self,
        documents: S,
        mut cancel: watch::Receiver<bool>,
    ) -> VectorResult<IngestionReport>
    where
        S: Stream<Item = Document> + Send,
    {
        self.config.validate()?;

        let mut batches = Box::pin(documents.chunks(self.config.batch_size));
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let metrics = IngestMetrics::new(&self.config.index_name);
        let mut workers: JoinSet<BatchOutcome> = JoinSet::new();
        let mut pending: BTreeMap<usize, Vec<DocumentId>> = BTreeMap::new();
        let mut report = IngestionReport::default();

        loop {
            // Waiting for a permit bounds the number of batches held in memory
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|_| VectorError::Internal("Ingestion semaphore closed".to_string()))?,
                _ = cancelled(&mut cancel) => {
                    report.cancelled = true;
                    break;
                }
            };

            let stop = *cancel.borrow();
            if stop {
                report.cancelled = true;
                break;
            }

            let Some(documents) = batches.next().await else {
                break;
            };

            let index = match &report.index {
                Some(index) => index.clone(),
                None => {
                    let index = self.ensure_index().await?;
                    report.index = Some(index.clone());
                    index
                }
            };

            let batch_index = report.batches;
            report.batches += 1;
            pending.insert(batch_index, documents.iter().map(|d| d.id.clone()).collect());

            debug!(batch_index, documents = documents.len(), "Dispatching batch");

            let job = BatchJob {
                client: Arc::clone(&self.client),
                generator: Arc::clone(&self.generator),
                index,
                retry: self.config.retry,
                metrics: metrics.clone(),
                cancel: cancel.clone(),
                batch_index,
            };
            workers.spawn(async move {
                let _permit = permit;
                job.run(documents).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    pending.remove(&outcome.batch_index);
                    match outcome.result {
                        Ok(()) => report.committed.extend(outcome.document_ids),
                        Err(error) => report.failures.push(BatchFailure {
                            batch_index: outcome.batch_index,
                            document_ids: outcome.document_ids,
                            error,
                        }),
                    }
                }
                Err(e) => error!(error = %e, "Ingestion worker aborted"),
            }
        }

        // Batches whose worker panicked never reported back
        for (batch_index, document_ids) in pending {
            report.failures.push(BatchFailure {
                batch_index,
                error: VectorError::BatchIngestionFailed {
                    batch_index,
                    document_ids: document_ids.clone(),
                    attempts: 0,
                    reason: "worker aborted".to_string(),
                },
                document_ids,
            });
        }
        report.failures.sort_by_key(|f| f.batch_index);

        info!(
            batches = report.batches,
            committed = report.committed.len(),
            failed_batches = report.failures.len(),
            cancelled = report.cancelled,
            "Ingestion finished"
        );

        Ok(report)
    }

    /// Create or verify the target index, retrying transient backend errors
    async fn ensure_index(&self) -> VectorResult<Index> {
        let config = self.config.index_config(self.generator.dimension());
        let mut retry = 0;

        loop {
            match self
                .client
                .ensure_index(&self.config.index_name, config.clone())
                .await
            {
                Ok(index) => return Ok(index),
                Err(e) if e.is_transient() && retry < self.config.retry.max_retries => {
                    let delay = self.config.retry.backoff_delay(retry);
                    warn!(error = %e, retry, delay_ms = delay.as_millis() as u64, "Retrying ensure_index");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Resolves once cancellation is requested; never resolves if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|c| *c).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

struct BatchOutcome {
    batch_index: usize,
    document_ids: Vec<DocumentId>,
    result: VectorResult<()>,
}

struct BatchJob<C: ?Sized> {
    client: Arc<C>,
    generator: Arc<EmbeddingGenerator>,
    index: Index,
    retry: RetryPolicy,
    metrics: IngestMetrics,
    cancel: watch::Receiver<bool>,
    batch_index: usize,
}

impl<C: VectorIndexClient + ?Sized> BatchJob<C> {
    async fn run(mut self, documents: Vec<Document>) -> BatchOutcome {
        let started = Instant::now();
        let document_ids: Vec<DocumentId> = documents.iter().map(|d| d.id.clone()).collect();

        let result = self.process(&documents, &document_ids).await;
        match &result {
            Ok(()) => {
                debug!(batch_index = self.batch_index, documents = documents.len(), "Batch committed");
                self.metrics.batch_committed(documents.len(), started.elapsed());
            }
            Err(e) => {
                error!(batch_index = self.batch_index, documents = documents.len(), error = %e, "Batch failed");
                self.metrics.batch_failed(documents.len(), started.elapsed());
            }
        }

        BatchOutcome {
            batch_index: self.batch_index,
            document_ids,
            result,
        }
    }

    #[instrument(skip_all, fields(index = %self.index.name, batch_index = self.batch_index))]
    async fn process(&mut self, documents: &[Document], document_ids: &[DocumentId]) -> VectorResult<()> {
        let mut records: Option<Vec<IndexedRecord>> = None;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(documents, &mut records).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt > self.retry.max_retries {
                return Err(VectorError::BatchIngestionFailed {
                    batch_index: self.batch_index,
                    document_ids: document_ids.to_vec(),
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            let delay = self.retry.backoff_delay(attempt - 1);
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying batch");
            self.metrics.batch_retried();

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled(&mut self.cancel) => {
                    return Err(VectorError::BatchIngestionFailed {
                        batch_index: self.batch_index,
                        document_ids: document_ids.to_vec(),
                        attempts: attempt,
                        reason: "cancelled".to_string(),
                    });
                }
            }
        }
    }

    /// One embed-and-write attempt; vectors from an earlier attempt are reused
    async fn attempt(
        &self,
        documents: &[Document],
        records: &mut Option<Vec<IndexedRecord>>,
    ) -> VectorResult<()> {
        let built = match records.take() {
            Some(built) => built,
            None => self.build_records(documents).await?,
        };

        let result = self.client.bulk_upsert(&self.index, &built).await;
        *records = Some(built);
        result?.into_result()?;
        Ok(())
    }

    async fn build_records(&self, documents: &[Document]) -> VectorResult<Vec<IndexedRecord>> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.generator.embed(&texts).await?;

        documents
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(document, vector)| IndexedRecord::new(document, vector, self.index.dimension()))
            .collect()
    }
}
