use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_parse};

/// OpenSearch connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSearchConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Ask the cluster to refresh after each bulk write so records are searchable immediately
    pub refresh_on_write: bool,
}

impl OpenSearchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            timeout_secs: 30,
            refresh_on_write: true,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_refresh_on_write(mut self, refresh: bool) -> Self {
        self.refresh_on_write = refresh;
        self
    }
}

impl FromEnv for OpenSearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("OPENSEARCH_URL", "http://localhost:9200");
        let timeout_secs = env_parse("OPENSEARCH_TIMEOUT_SECS", 30u64)?;
        let refresh_on_write = env_flag("OPENSEARCH_REFRESH", true)?;

        Ok(Self::new(url)
            .with_timeout(timeout_secs)
            .with_refresh_on_write(refresh_on_write))
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self::new("http://localhost:9200")
    }
}
