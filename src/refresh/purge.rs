//! Fleet-wide cache invalidation.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use futures::future::join_all;

use crate::backend::BackendSet;
use crate::config::PurgeConfig;
use crate::proxy::{BackendOutcome, UpstreamClient};

const CACHE_TAGS: HeaderName = HeaderName::from_static("cache-tags");

/// Per-backend outcome of one purge run, in snapshot order.
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
    pub results: Vec<(String, BackendOutcome)>,
}

impl PurgeReport {
    /// Backends that answered with a 2xx status.
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, outcome)| {
                matches!(outcome, BackendOutcome::Responded(status) if status.is_success())
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Sends a `BAN` carrying the configured `Cache-Tags` to every backend.
///
/// Failures are logged and reported, never retried: a node that cannot
/// be reached has no cache worth invalidating.
pub struct PurgeBroadcaster {
    upstream: Arc<UpstreamClient>,
    method: Method,
    cache_tags: HeaderValue,
}

impl PurgeBroadcaster {
    pub fn new(upstream: Arc<UpstreamClient>, config: &PurgeConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            upstream,
            method: ban_method(),
            cache_tags: HeaderValue::from_str(&config.cache_tags)?,
        })
    }

    /// Purge every backend in `backends` concurrently and wait for all.
    pub async fn purge_all(&self, backends: &BackendSet) -> PurgeReport {
        tracing::info!(backends = %backends, "Purging caches");

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_TAGS, self.cache_tags.clone());

        let calls = backends.iter().map(|backend| {
            let headers = headers.clone();
            async move {
                let outcome = self
                    .upstream
                    .execute(backend, self.method.clone(), backend.clone(), headers, Bytes::new())
                    .await;
                (backend.clone(), outcome)
            }
        });

        let report = PurgeReport {
            results: join_all(calls).await,
        };

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Purge complete"
        );
        report
    }
}

fn ban_method() -> Method {
    Method::from_bytes(b"BAN").expect("BAN is a valid method token")
}
