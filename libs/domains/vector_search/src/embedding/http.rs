use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::{VectorError, VectorResult};

pub(crate) fn build_client(timeout_secs: u64) -> VectorResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Connection failures and timeouts may clear up; anything else is a bug in the request
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> VectorError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        VectorError::EmbeddingUnavailable(format!("{}: {}", provider, err))
    } else {
        VectorError::Embedding(format!("{}: {}", provider, err))
    }
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Map a non-success response to an error, consuming the body for context
pub(crate) async fn status_error(provider: &str, response: Response) -> VectorError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = format!("{} API error ({}): {}", provider, status, body);

    if is_retryable_status(status) {
        VectorError::EmbeddingUnavailable(message)
    } else {
        VectorError::Embedding(message)
    }
}
