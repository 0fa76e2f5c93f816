//! Notification Module
//!
//! A user-visible record of one tracked operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, OpsError, TransportError};

// == Notification Message ==
/// Text or a structured payload for the presentation layer to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationMessage {
    Text(String),
    Structured(serde_json::Value),
}

impl From<&str> for NotificationMessage {
    fn from(text: &str) -> Self {
        NotificationMessage::Text(text.to_string())
    }
}

impl From<String> for NotificationMessage {
    fn from(text: String) -> Self {
        NotificationMessage::Text(text)
    }
}

impl From<serde_json::Value> for NotificationMessage {
    fn from(value: serde_json::Value) -> Self {
        NotificationMessage::Structured(value)
    }
}

// == Notification Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Succeeded,
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NotificationStatus::Pending)
    }
}

// == Notification Error ==
/// Why a notification failed, with the backend's payload when there was one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportError>,
}

impl From<ErrorKind> for NotificationError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, transport: None }
    }
}

impl From<&OpsError> for NotificationError {
    fn from(err: &OpsError) -> Self {
        Self {
            kind: err.kind(),
            transport: err.transport().cloned(),
        }
    }
}

// == Notification ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: NotificationMessage,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NotificationError>,
}

impl Notification {
    pub fn pending(id: String, message: NotificationMessage) -> Self {
        Self {
            id,
            message,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            error: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Moves a pending notification to `status`. Returns false, leaving the
    /// notification untouched, if it is already resolved or `status` is
    /// `Pending`.
    pub(crate) fn resolve(
        &mut self,
        status: NotificationStatus,
        message: Option<NotificationMessage>,
        error: Option<NotificationError>,
    ) -> bool {
        if self.is_resolved() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.resolved_at = Some(Utc::now());
        self.error = error;
        if let Some(message) = message {
            self.message = message;
        }
        true
    }
}
