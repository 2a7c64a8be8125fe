//! Qdrant test infrastructure
//!
//! Provides a `TestQdrant` helper that creates a Qdrant container for testing.

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const IMAGE: &str = "qdrant/qdrant";
const TAG: &str = "v1.15.4";
const GRPC_PORT: u16 = 6334;

/// Test Qdrant wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestQdrant {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    url: String,
}

impl TestQdrant {
    /// Create a new test Qdrant instance exposing the gRPC port
    pub async fn new() -> Self {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(GRPC_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Qdrant gRPC listening on"))
            .start()
            .await
            .expect("Failed to start Qdrant container");

        let host_port = container
            .get_host_port_ipv4(GRPC_PORT)
            .await
            .expect("Failed to get Qdrant port");

        let url = format!("http://127.0.0.1:{}", host_port);
        tracing::info!(port = host_port, "Test Qdrant ready ({}:{})", IMAGE, TAG);

        Self { container, url }
    }

    /// gRPC endpoint for `qdrant_client::Qdrant::from_url`
    pub fn url(&self) -> &str {
        &self.url
    }
}

// Container is automatically cleaned up when TestQdrant is dropped
impl Drop for TestQdrant {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Qdrant container");
    }
}
