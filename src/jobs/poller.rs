//! Async Job Poller
//!
//! Repeatedly checks a job's status until it succeeds, fails, runs out of
//! attempts or time, or the caller cancels.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{OpsError, Result};
use crate::jobs::{JobHandle, JobStatus, Progress, StatusCheck};

// == Backoff ==
/// How the delay between status checks grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Constant `interval`
    None,
    /// `interval * retry`
    Linear,
    /// `interval * 2^(retry - 1)`
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "constant" => Ok(Backoff::None),
            "linear" => Ok(Backoff::Linear),
            "exponential" => Ok(Backoff::Exponential),
            other => Err(format!("unknown backoff: {}", other)),
        }
    }
}

// == Poll Options ==
/// Tunable parameters for a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOptions {
    /// Base delay between two status checks
    pub interval: Duration,
    /// Total time budget, measured from the first check
    pub timeout: Duration,
    /// Maximum number of completed status checks (at least one is always made)
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Upper bound on any single delay
    pub max_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            max_attempts: 300,
            backoff: Backoff::Exponential,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl PollOptions {
    /// Delay to wait before retry number `retry` (1-based), clamped to
    /// [`PollOptions::max_interval`].
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            Backoff::None => self.interval,
            Backoff::Linear => self.interval.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                self.interval.saturating_mul(factor)
            }
        };
        delay.min(self.max_interval)
    }
}

// == Async Job Poller ==
/// Drives status checks for job handles. Each poll is independent, so any
/// number of handles can be polled at once.
#[derive(Debug, Clone, Default)]
pub struct AsyncJobPoller {
    defaults: PollOptions,
}

impl AsyncJobPoller {
    pub fn new(defaults: PollOptions) -> Self {
        Self { defaults }
    }

    /// Options used when the caller does not supply its own.
    pub fn defaults(&self) -> &PollOptions {
        &self.defaults
    }

    /// Polls `handle` until a terminal status.
    ///
    /// The first check runs immediately. `Succeeded` resolves to `Ok`, a
    /// backend `Failed` to [`OpsError::JobFailed`], and a transport error from
    /// the check itself to [`OpsError::StatusCheckFailure`]. Running out of
    /// attempts or time yields [`OpsError::PollTimeout`] with the last
    /// observed progress; cancellation yields [`OpsError::Cancelled`].
    pub async fn poll<T, C>(
        &self,
        handle: &JobHandle,
        check: &C,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        C: StatusCheck<T> + ?Sized,
    {
        let deadline = Instant::now() + options.timeout;
        let max_attempts = options.max_attempts.max(1);
        let mut attempts = 0u32;
        let mut last_status: Option<Progress> = None;

        loop {
            let observed = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(job = %handle, attempts, "Job poll cancelled");
                    return Err(OpsError::Cancelled);
                }
                result = check.check_status(handle) => result,
                _ = sleep_until(deadline) => {
                    return Err(timed_out(handle, attempts, last_status));
                }
            };
            attempts += 1;

            match observed {
                Ok(JobStatus::Succeeded(value)) => {
                    info!(job = %handle, attempts, "Job succeeded");
                    return Ok(value);
                }
                Ok(JobStatus::Failed(err)) => {
                    info!(job = %handle, attempts, error = %err, "Job failed");
                    return Err(OpsError::JobFailed(err));
                }
                Err(err) => {
                    warn!(job = %handle, attempts, error = %err, "Status check failed");
                    return Err(OpsError::StatusCheckFailure(err));
                }
                Ok(JobStatus::InProgress(progress)) => {
                    debug!(job = %handle, attempts, percent = ?progress.percent, "Job in progress");
                    last_status = Some(progress);
                }
            }

            if attempts >= max_attempts {
                return Err(timed_out(handle, attempts, last_status));
            }

            // Wait before the next attempt, respecting cancellation and the deadline.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(job = %handle, attempts, "Job poll cancelled");
                    return Err(OpsError::Cancelled);
                }
                _ = sleep_until(deadline) => {
                    return Err(timed_out(handle, attempts, last_status));
                }
                _ = sleep(options.delay_for(attempts)) => {}
            }
        }
    }

    /// Spawns a poll on its own task and returns a handle to cancel or await it.
    pub fn spawn<T, C>(&self, handle: JobHandle, check: Arc<C>, options: PollOptions) -> PollHandle<T>
    where
        T: Send + 'static,
        C: StatusCheck<T> + ?Sized + 'static,
    {
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        let job = handle.clone();

        let task = tokio::spawn(async move { poller.poll(&job, check.as_ref(), &options, &token).await });

        PollHandle { handle, cancel, task }
    }
}

fn timed_out(handle: &JobHandle, attempts: u32, last_status: Option<Progress>) -> OpsError {
    warn!(job = %handle, attempts, "Job poll timed out");
    OpsError::PollTimeout {
        attempts,
        last_status,
    }
}

// == Poll Handle ==
/// A poll running on its own task.
#[derive(Debug)]
pub struct PollHandle<T> {
    handle: JobHandle,
    cancel: CancellationToken,
    task: JoinHandle<Result<T>>,
}

impl<T> PollHandle<T> {
    pub fn job(&self) -> &JobHandle {
        &self.handle
    }

    /// Stops future status checks. The backend job itself is unaffected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the terminal outcome.
    pub async fn outcome(self) -> Result<T> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(job = %self.handle, error = %err, "Poll task ended abnormally");
                Err(OpsError::from(err))
            }
        }
    }
}
