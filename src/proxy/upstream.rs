use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::ClientConfig;
use crate::proxy::status::BackendOutcome;

/// Shared outbound HTTP client.
///
/// One pooled `reqwest::Client` serves every broadcast and purge. The
/// request timeout is set on the client, so no call can hang forever.
/// Redirects are not followed: the status a cache node answers with is
/// what gets reported.
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(Policy::none())
            .build()?;

        Ok(Self { client })
    }

    /// Send one request to `backend` and reduce the result to an outcome.
    ///
    /// Errors are logged with the backend address and never returned. The
    /// response body is read chunk by chunk and discarded, so the connection
    /// can go back to the pool without buffering the whole body.
    pub async fn execute(
        &self,
        backend: &str,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Bytes,
    ) -> BackendOutcome {
        let result = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await;

        match result {
            Ok(mut response) => {
                let status = response.status();
                tracing::info!(backend = %backend, status = %status, "Response");
                // Chunks are dropped as they arrive; only the status is kept
                loop {
                    match response.chunk().await {
                        Ok(Some(_)) => continue,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::debug!(backend = %backend, error = %e, "Failed to drain response body");
                            break;
                        }
                    }
                }
                BackendOutcome::Responded(status)
            }
            Err(e) => {
                tracing::warn!(
                    backend = %backend,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    error = %e,
                    "Request to backend failed"
                );
                BackendOutcome::TransportFailure
            }
        }
    }
}
