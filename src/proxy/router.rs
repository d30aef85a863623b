use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::Instrument;
use uuid::Uuid;

use crate::proxy::dispatcher::{Dispatcher, InboundRequest};
use crate::proxy::error::{ErrorResponse, ProxyError};

#[derive(Clone)]
pub struct RouterEngine {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

impl RouterEngine {
    pub fn new(dispatcher: Arc<Dispatcher>, max_body_bytes: usize) -> Self {
        Self {
            dispatcher,
            max_body_bytes,
        }
    }
}

/// Every method and path goes to the broadcast handler.
pub fn build_router(engine: RouterEngine) -> Router {
    Router::new().fallback(broadcast_handler).with_state(engine)
}

async fn broadcast_handler(State(engine): State<RouterEngine>, req: Request<Body>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("broadcast", request_id = %request_id);

    async move {
        let (parts, body) = req.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        tracing::info!(
            method = %parts.method,
            uri = %path_and_query,
            headers = ?parts.headers,
            "Got request"
        );

        let body = match read_body(body, engine.max_body_bytes).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "Rejecting request");
                return ErrorResponse::from_error(&err, &request_id);
            }
        };

        let inbound = InboundRequest {
            method: parts.method,
            path_and_query,
            headers: parts.headers,
            body,
        };

        let outcome = engine.dispatcher.forward(&inbound).await;
        tracing::info!(
            status = %outcome.status,
            statuses = ?outcome.statuses.codes(),
            "Broadcast complete"
        );
        outcome.into_response()
    }
    .instrument(span)
    .await
}

/// Buffer the whole body, refusing anything over `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProxyError::PayloadTooLarge { limit })
        }
        Err(e) => Err(ProxyError::InvalidRequest(format!(
            "Failed to read request body: {}",
            e
        ))),
    }
}
