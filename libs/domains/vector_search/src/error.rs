use std::fmt;

use core_config::ConfigError;
use thiserror::Error;

use crate::models::{BulkItemFailure, DocumentId};

/// Stage of a query that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Embedding,
    Search,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStage::Embedding => f.write_str("embedding"),
            QueryStage::Search => f.write_str("search"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error(
        "Embedding dimension mismatch at position {position}: expected {expected}, got {actual}"
    )]
    EmbeddingDimensionMismatch {
        expected: usize,
        actual: usize,
        position: usize,
    },

    #[error("Index '{index}' already exists with dimension {existing}, requested {requested}")]
    IndexDimensionConflict {
        index: String,
        existing: usize,
        requested: usize,
    },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error(
        "Batch {batch_index} failed after {attempts} attempt(s), {} document(s) unconfirmed: {reason}",
        .document_ids.len()
    )]
    BatchIngestionFailed {
        batch_index: usize,
        document_ids: Vec<DocumentId>,
        attempts: u32,
        reason: String,
    },

    #[error("Dimension mismatch{}: expected {expected}, got {actual}", .document_id.as_ref().map(|id| format!(" for document {id}")).unwrap_or_default())]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        document_id: Option<DocumentId>,
    },

    #[error("Backend error: {message}")]
    Backend { message: String, transient: bool },

    #[error("Backend rejected {} record(s), first: {}", .failed.len(), .failed.first().map(|f| f.to_string()).unwrap_or_default())]
    BulkRejected { failed: Vec<BulkItemFailure> },

    #[error("Query failed during {stage}: {source}")]
    Query {
        stage: QueryStage,
        #[source]
        source: Box<VectorError>,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    pub fn backend(message: impl Into<String>) -> Self {
        VectorError::Backend {
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient_backend(message: impl Into<String>) -> Self {
        VectorError::Backend {
            message: message.into(),
            transient: true,
        }
    }

    pub fn query(stage: QueryStage, source: VectorError) -> Self {
        VectorError::Query {
            stage,
            source: Box::new(source),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            VectorError::EmbeddingUnavailable(_) => true,
            VectorError::Backend { transient, .. } => *transient,
            // A resubmit cannot fix items like mapping errors
            VectorError::BulkRejected { failed } => failed.iter().any(|item| item.retryable),
            VectorError::Query { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Innermost error, unwrapping query stage tags.
    pub fn root(&self) -> &VectorError {
        match self {
            VectorError::Query { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            VectorError::Query { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        let transient = match &err {
            qdrant_client::QdrantError::ResponseError { status } => {
                // DEADLINE_EXCEEDED, RESOURCE_EXHAUSTED, ABORTED, UNAVAILABLE
                matches!(i32::from(status.code()), 4 | 8 | 10 | 14)
            }
            _ => false,
        };
        VectorError::Backend {
            message: format!("Qdrant: {}", err),
            transient,
        }
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}
