//! OpenSearch test infrastructure
//!
//! Provides a `TestOpenSearch` helper that runs a single-node OpenSearch
//! container (k-NN plugin included, security plugin disabled).

use std::time::Duration;

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const IMAGE: &str = "opensearchproject/opensearch";
const TAG: &str = "2.19.1";
const HTTP_PORT: u16 = 9200;

/// Test OpenSearch wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestOpenSearch;
///
/// # async fn example() {
/// let opensearch = TestOpenSearch::new().await;
/// let url = opensearch.url();
/// // Point an OpenSearch client at `url`
/// # }
/// ```
pub struct TestOpenSearch {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    url: String,
}

impl TestOpenSearch {
    /// Start a container and wait until the cluster reports at least yellow health
    pub async fn new() -> Self {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(HTTP_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("] started"))
            .with_env_var("discovery.type", "single-node")
            .with_env_var("DISABLE_SECURITY_PLUGIN", "true")
            .with_env_var("DISABLE_INSTALL_DEMO_CONFIG", "true")
            .with_env_var("OPENSEARCH_JAVA_OPTS", "-Xms512m -Xmx512m")
            .start()
            .await
            .expect("Failed to start OpenSearch container");

        let host_port = container
            .get_host_port_ipv4(HTTP_PORT)
            .await
            .expect("Failed to get OpenSearch port");

        let url = format!("http://127.0.0.1:{}", host_port);
        wait_for_health(&url).await;

        tracing::info!(port = host_port, "Test OpenSearch ready ({}:{})", IMAGE, TAG);

        Self { container, url }
    }

    /// Base URL of the REST API
    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn wait_for_health(url: &str) {
    let client = reqwest::Client::new();
    let health = format!("{}/_cluster/health?wait_for_status=yellow&timeout=5s", url);

    for _ in 0..60 {
        if let Ok(response) = client.get(&health).send().await {
            if response.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    panic!("OpenSearch at {} did not become healthy", url);
}

// Container is automatically cleaned up when TestOpenSearch is dropped
impl Drop for TestOpenSearch {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test OpenSearch container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_opensearch_has_knn_plugin() {
        let opensearch = TestOpenSearch::new().await;

        let plugins = reqwest::get(format!("{}/_cat/plugins", opensearch.url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(plugins.contains("opensearch-knn"));
    }
}
