//! Error types for operation tracking
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::jobs::Progress;

// == Transport Error ==
/// Failure reported by an injected capability (submit, status check, fetch).
///
/// The payload is carried through untouched so the presentation layer can
/// render whatever the backend said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportError {
    /// Human readable error text
    pub message: String,
    /// Raw backend payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

// == Error Kind ==
/// Outcome classification exposed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FetchFailure,
    DuplicateId,
    PollTimeout,
    Cancelled,
    SubmitFailure,
    JobFailed,
    StatusCheckFailure,
    Aborted,
}

// == Ops Error Enum ==
/// Unified error type for loader, poller, tracker and coordinator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpsError {
    /// The fetch capability rejected; never cached
    #[error("Fetch failed: {0}")]
    FetchFailure(TransportError),

    /// An unresolved notification already uses this id
    #[error("Duplicate notification id: {0}")]
    DuplicateId(String),

    /// No terminal status before the attempt or time budget ran out
    #[error("Job poll timed out after {attempts} attempts")]
    PollTimeout {
        attempts: u32,
        last_status: Option<Progress>,
    },

    /// Polling was cancelled by the caller
    #[error("Job poll cancelled")]
    Cancelled,

    /// The submit capability failed before any job existed
    #[error("Submit failed: {0}")]
    SubmitFailure(TransportError),

    /// The backend reported the job as failed
    #[error("Job failed: {0}")]
    JobFailed(TransportError),

    /// The status check itself failed at the transport level
    #[error("Status check failed: {0}")]
    StatusCheckFailure(TransportError),

    /// The task running the operation panicked
    #[error("Operation aborted: {0}")]
    Aborted(String),
}

impl OpsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpsError::FetchFailure(_) => ErrorKind::FetchFailure,
            OpsError::DuplicateId(_) => ErrorKind::DuplicateId,
            OpsError::PollTimeout { .. } => ErrorKind::PollTimeout,
            OpsError::Cancelled => ErrorKind::Cancelled,
            OpsError::SubmitFailure(_) => ErrorKind::SubmitFailure,
            OpsError::JobFailed(_) => ErrorKind::JobFailed,
            OpsError::StatusCheckFailure(_) => ErrorKind::StatusCheckFailure,
            OpsError::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// The original transport payload, when the failure came from a capability.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            OpsError::FetchFailure(e)
            | OpsError::SubmitFailure(e)
            | OpsError::JobFailed(e)
            | OpsError::StatusCheckFailure(e) => Some(e),
            _ => None,
        }
    }
}

/// A panicked task is `Aborted`; one torn down by the runtime is `Cancelled`.
impl From<tokio::task::JoinError> for OpsError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            OpsError::Aborted(err.to_string())
        } else {
            OpsError::Cancelled
        }
    }
}

// == Volume Error Enum ==
/// Errors from the spare-drive service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VolumeError {
    /// No spare volume with this id
    #[error("Volume not found: {0}")]
    NotFound(String),

    /// Another operation still owns the volume
    #[error("Volume busy: {0}")]
    Busy(String),

    /// Rejected before anything was submitted
    #[error("Invalid volume request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Ops(#[from] OpsError),
}

// == API Error Enum ==
/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure from the tracking core
    #[error(transparent)]
    Ops(#[from] OpsError),

    /// Failure from the spare-drive service
    #[error(transparent)]
    Volume(#[from] VolumeError),
}

fn ops_status(err: &OpsError) -> StatusCode {
    match err.kind() {
        ErrorKind::DuplicateId => StatusCode::CONFLICT,
        ErrorKind::PollTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Aborted => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Ops(err) | ApiError::Volume(VolumeError::Ops(err)) => {
                (ops_status(err), Some(err.kind()))
            }
            ApiError::Volume(VolumeError::NotFound(_)) => (StatusCode::NOT_FOUND, None),
            ApiError::Volume(VolumeError::Busy(_)) => (StatusCode::CONFLICT, None),
            ApiError::Volume(VolumeError::Invalid(_)) => (StatusCode::BAD_REQUEST, None),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tracking core.
pub type Result<T> = std::result::Result<T, OpsError>;
