//! Error types and response handling for the forwarder.
//!
//! Provides request-level error classification with HTTP status mapping
//! and JSON error bodies, plus the startup errors that stop the process
//! before it serves traffic.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::Response;
use thiserror::Error;

use crate::backend::DirectoryError;

/// Errors that stop a request before it is broadcast.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Body exceeded the buffering limit
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Invalid request format or unreadable body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    /// Map error variant to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get error type string for JSON responses
    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::PayloadTooLarge { .. } => "payload_too_large",
            ProxyError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Builder for standardized error responses
pub struct ErrorResponse;

impl ErrorResponse {
    /// Create a JSON error response from a ProxyError
    pub fn from_error(err: &ProxyError, request_id: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": err.error_type(),
                "message": err.to_string(),
                "request_id": request_id
            }
        });

        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = err.status_code();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Errors that prevent the forwarder from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid purge tag header value: {0}")]
    PurgeTags(#[source] InvalidHeaderValue),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server must be bound before it is run")]
    NotBound,

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
