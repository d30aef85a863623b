//! Fan-out of one inbound request to every known backend.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderValue, Method};
use futures::future::join_all;

use crate::proxy::status::{BroadcastOutcome, StatusVector};
use crate::proxy::upstream::UpstreamClient;
use crate::refresh::{RefreshCoordinator, RefreshTrigger};

/// A fully buffered inbound request.
///
/// The body is read once; each outbound copy holds its own `Bytes` handle
/// onto the same buffer.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path plus query string, e.g. `/purge?tag=a`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct Dispatcher {
    upstream: Arc<UpstreamClient>,
    coordinator: Arc<RefreshCoordinator>,
    refresh: RefreshTrigger,
}

impl Dispatcher {
    pub fn new(
        upstream: Arc<UpstreamClient>,
        coordinator: Arc<RefreshCoordinator>,
        refresh: RefreshTrigger,
    ) -> Self {
        Self {
            upstream,
            coordinator,
            refresh,
        }
    }

    /// Mirror `request` to every backend in the current snapshot and wait
    /// for all of them.
    ///
    /// Any unreachable backend schedules a single background refresh and
    /// turns the global status into a failure.
    pub async fn forward(&self, request: &InboundRequest) -> BroadcastOutcome {
        // Reading the snapshot never blocks on a refresh in flight
        let backends = self.coordinator.snapshot();
        let headers = outbound_headers(&request.headers);

        let calls = backends.iter().map(|backend| {
            let url = outbound_url(backend, &request.path_and_query);
            tracing::info!(
                backend = %backend,
                method = %request.method,
                url = %url,
                headers = ?headers,
                "Forwarding request"
            );
            self.upstream.execute(
                backend,
                request.method.clone(),
                url,
                headers.clone(),
                request.body.clone(),
            )
        });

        let statuses: StatusVector = join_all(calls).await.into_iter().collect();

        if statuses.has_transport_failure() {
            self.refresh.request();
        }

        BroadcastOutcome::from(statuses)
    }
}

/// Backend base address joined with the inbound path and query.
pub fn outbound_url(backend: &str, path_and_query: &str) -> String {
    format!("{}{}", backend.trim_end_matches('/'), path_and_query)
}

/// Inbound headers as sent to each backend.
///
/// `Host` and the framing headers are left to the client, which derives
/// them from the backend URL and the buffered body. The connection is
/// always asked to stay open.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}
