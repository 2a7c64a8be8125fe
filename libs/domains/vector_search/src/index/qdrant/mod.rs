mod client;
mod config;

pub use client::QdrantIndexClient;
pub use config::QdrantConfig;
