//! Job Status Module
//!
//! Job handles, observed job states and the status-check capability.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

// == Job Handle ==
/// Opaque reference to a backend job, returned by a submit capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Progress ==
/// What the backend said about a job that has not finished yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Progress {
    pub fn percent(percent: u8) -> Self {
        Self {
            percent: Some(percent.min(100)),
            detail: None,
        }
    }
}

// == Job Status ==
/// A single observation of a backend job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    InProgress(Progress),
    Succeeded(T),
    Failed(TransportError),
}

impl<T> JobStatus<T> {
    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress(_))
    }
}

// == Status Check Capability ==
/// Queries the backend for the current state of a job.
#[async_trait]
pub trait StatusCheck<T>: Send + Sync {
    async fn check_status(&self, handle: &JobHandle) -> Result<JobStatus<T>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::<u32>::InProgress(Progress::default()).is_terminal());
        assert!(JobStatus::Succeeded(42u32).is_terminal());
        assert!(JobStatus::<u32>::Failed(TransportError::new("nope")).is_terminal());
    }

    #[test]
    fn test_progress_percent_is_clamped() {
        assert_eq!(Progress::percent(150).percent, Some(100));
    }

    #[test]
    fn test_job_handle_serializes_as_string() {
        let handle = JobHandle::new("job-7");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"job-7\"");
        assert_eq!(handle.to_string(), "job-7");
    }
}
