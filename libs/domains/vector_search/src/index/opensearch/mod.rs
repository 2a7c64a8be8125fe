mod client;
mod config;

pub use client::OpenSearchIndexClient;
pub use config::OpenSearchConfig;
