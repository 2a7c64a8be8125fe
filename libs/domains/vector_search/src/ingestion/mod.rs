mod config;
mod pipeline;
mod report;
mod retry;

pub use config::{IngestionConfig, DEFAULT_BATCH_SIZE, DEFAULT_INDEX_NAME};
pub use pipeline::IngestionPipeline;
pub use report::{BatchFailure, IngestionReport};
pub use retry::RetryPolicy;
