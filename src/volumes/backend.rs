//! Simulated Volume Backend
//!
//! In-memory stand-in for a cloud volume API. Create and attach run as jobs
//! that finish after a fixed duration; delete answers immediately.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TransportError;
use crate::jobs::{JobHandle, JobStatus, Progress, StatusCheck};
use crate::ops::{Submission, Submit};
use crate::volumes::{Volume, VolumeRequest};

/// Names and machine ids with this prefix make the simulated job fail.
pub const FAILURE_PREFIX: &str = "fail";

struct SimulatedJob {
    started_at: Instant,
    /// Volume stored when the job succeeds, or the backend error
    outcome: Result<Volume, TransportError>,
}

#[derive(Default)]
struct BackendState {
    /// Keyed by id; v7 ids keep creation order
    volumes: BTreeMap<String, Volume>,
    jobs: HashMap<String, SimulatedJob>,
}

// == Simulated Volume Backend ==
pub struct SimulatedVolumeBackend {
    job_duration: Duration,
    state: Mutex<BackendState>,
}

impl SimulatedVolumeBackend {
    pub fn new(job_duration: Duration) -> Self {
        Self {
            job_duration,
            state: Mutex::new(BackendState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores volumes as if they already existed.
    pub fn seed(&self, volumes: impl IntoIterator<Item = Volume>) {
        let mut state = self.lock();
        for volume in volumes {
            state.volumes.insert(volume.id.clone(), volume);
        }
    }

    /// Volumes not attached to any virtual machine.
    pub fn spares(&self) -> Vec<Volume> {
        self.lock()
            .volumes
            .values()
            .filter(|v| v.is_spare())
            .cloned()
            .collect()
    }

    pub fn volume(&self, id: &str) -> Option<Volume> {
        self.lock().volumes.get(id).cloned()
    }

    /// Number of jobs that have not reported a terminal status yet.
    pub fn running_jobs(&self) -> usize {
        self.lock().jobs.len()
    }

    fn start_job(&self, outcome: Result<Volume, TransportError>) -> JobHandle {
        let handle = JobHandle::new(Uuid::now_v7().to_string());
        self.lock().jobs.insert(
            handle.as_str().to_string(),
            SimulatedJob {
                started_at: Instant::now(),
                outcome,
            },
        );
        debug!(job = %handle, "Simulated job started");
        handle
    }
}

/// Error shaped like the cloud API's `{"<command>response": {...}}` payload.
fn backend_error(response: &str, code: u16, text: impl Into<String>) -> TransportError {
    let text = text.into();
    let mut payload = Map::new();
    payload.insert(
        response.to_string(),
        json!({ "errorcode": code, "errortext": text.clone() }),
    );
    TransportError::new(text).with_details(Value::Object(payload))
}

// == Submit ==
#[async_trait]
impl Submit<VolumeRequest, Volume> for SimulatedVolumeBackend {
    async fn submit(&self, request: VolumeRequest) -> Result<Submission<Volume>, TransportError> {
        match request {
            VolumeRequest::Create(creation) => {
                let volume = Volume::from_creation(Uuid::now_v7().to_string(), &creation);
                let outcome = if creation.name.starts_with(FAILURE_PREFIX) {
                    Err(backend_error(
                        "createvolumeresponse",
                        530,
                        format!("Failed to create volume {}", creation.name),
                    ))
                } else {
                    Ok(volume)
                };
                Ok(Submission::Job(self.start_job(outcome)))
            }
            VolumeRequest::Attach(attachment) => {
                let Some(mut volume) = self.volume(&attachment.volume_id) else {
                    return Err(backend_error(
                        "attachvolumeresponse",
                        431,
                        format!("Unable to find volume {}", attachment.volume_id),
                    ));
                };
                let outcome = if attachment.virtual_machine_id.starts_with(FAILURE_PREFIX) {
                    Err(backend_error(
                        "attachvolumeresponse",
                        530,
                        format!("Failed to attach volume {}", volume.name),
                    ))
                } else {
                    volume.virtual_machine_id = Some(attachment.virtual_machine_id);
                    Ok(volume)
                };
                Ok(Submission::Job(self.start_job(outcome)))
            }
            VolumeRequest::Delete { id } => match self.lock().volumes.remove(&id) {
                Some(volume) => {
                    info!(volume = %id, "Volume deleted");
                    Ok(Submission::Immediate(volume))
                }
                None => Err(backend_error(
                    "deletevolumeresponse",
                    431,
                    format!("Unable to find volume {}", id),
                )),
            },
        }
    }
}

// == Status Check ==
#[async_trait]
impl StatusCheck<Volume> for SimulatedVolumeBackend {
    async fn check_status(&self, handle: &JobHandle) -> Result<JobStatus<Volume>, TransportError> {
        let mut state = self.lock();

        let elapsed = match state.jobs.get(handle.as_str()) {
            Some(job) => job.started_at.elapsed(),
            None => {
                return Err(backend_error(
                    "queryasyncjobresultresponse",
                    431,
                    format!("Unknown job {}", handle),
                ))
            }
        };

        if elapsed < self.job_duration {
            let percent = (elapsed.as_millis() * 100 / self.job_duration.as_millis().max(1)) as u8;
            return Ok(JobStatus::InProgress(Progress::percent(percent)));
        }

        let Some(job) = state.jobs.remove(handle.as_str()) else {
            return Err(TransportError::new(format!("Unknown job {}", handle)));
        };
        match job.outcome {
            Ok(volume) => {
                state.volumes.insert(volume.id.clone(), volume.clone());
                Ok(JobStatus::Succeeded(volume))
            }
            Err(err) => Ok(JobStatus::Failed(err)),
        }
    }
}
