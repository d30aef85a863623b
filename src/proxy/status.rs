//! Reduction of per-backend outcomes into the reply sent to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Serialize, Serializer};

/// Value reported for a backend that could not be reached.
pub const TRANSPORT_FAILURE: i32 = -1;

/// Status code every backend is expected to answer with.
pub const SUCCESS_STATUS: StatusCode = StatusCode::OK;

/// Status returned to the caller when the broadcast is not a success.
pub const FAILURE_STATUS: StatusCode = StatusCode::BAD_GATEWAY;

/// What happened to one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOutcome {
    /// The backend answered with this status.
    Responded(StatusCode),
    /// Connection error, timeout or malformed response.
    TransportFailure,
}

impl BackendOutcome {
    /// Numeric form used in the response body.
    pub fn code(&self) -> i32 {
        match self {
            BackendOutcome::Responded(status) => i32::from(status.as_u16()),
            BackendOutcome::TransportFailure => TRANSPORT_FAILURE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BackendOutcome::Responded(status) if *status == SUCCESS_STATUS)
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, BackendOutcome::TransportFailure)
    }
}

impl Serialize for BackendOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Per-backend outcomes, index-aligned with the backend snapshot that
/// produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusVector(Vec<BackendOutcome>);

impl StatusVector {
    pub fn new(outcomes: Vec<BackendOutcome>) -> Self {
        Self(outcomes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn outcomes(&self) -> &[BackendOutcome] {
        &self.0
    }

    pub fn codes(&self) -> Vec<i32> {
        self.0.iter().map(BackendOutcome::code).collect()
    }

    pub fn any_success(&self) -> bool {
        self.0.iter().any(BackendOutcome::is_success)
    }

    pub fn has_transport_failure(&self) -> bool {
        self.0.iter().any(BackendOutcome::is_transport_failure)
    }

    /// Success only when some backend answered 200 and none was unreachable.
    /// An unreachable backend makes the whole broadcast suspect, so the
    /// caller is told to retry once the backend list has been refreshed.
    pub fn global_status(&self) -> StatusCode {
        if self.has_transport_failure() || !self.any_success() {
            FAILURE_STATUS
        } else {
            SUCCESS_STATUS
        }
    }
}

impl FromIterator<BackendOutcome> for StatusVector {
    fn from_iter<I: IntoIterator<Item = BackendOutcome>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JSON body of a broadcast reply.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub statuses: StatusVector,
}

/// Result of one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub status: StatusCode,
    pub statuses: StatusVector,
}

impl From<StatusVector> for BroadcastOutcome {
    fn from(statuses: StatusVector) -> Self {
        Self {
            status: statuses.global_status(),
            statuses,
        }
    }
}

impl IntoResponse for BroadcastOutcome {
    fn into_response(self) -> Response {
        let report = StatusReport {
            statuses: self.statuses,
        };
        (self.status, Json(report)).into_response()
    }
}
