//! Operation Coordinator
//!
//! Runs a tracked operation end to end: notification, submission, job
//! polling, reconciliation and the final notification transition.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ErrorKind, OpsError, Result, TransportError};
use crate::jobs::{AsyncJobPoller, JobHandle, PollOptions, StatusCheck};
use crate::notify::{JobNotificationTracker, NotificationError, NotificationMessage};

// == Submit Capability ==
/// What a backend hands back for a submitted request.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// The operation completed synchronously
    Immediate(T),
    /// The operation continues as a backend job
    Job(JobHandle),
}

/// Sends a request to the backend.
#[async_trait]
pub trait Submit<R, T>: Send + Sync {
    async fn submit(&self, request: R) -> std::result::Result<Submission<T>, TransportError>;
}

// == Operation Messages ==
/// Notification messages for each stage of an operation. `done` and
/// `failed` keep the in-progress message when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMessages {
    pub in_progress: NotificationMessage,
    pub done: Option<NotificationMessage>,
    pub failed: Option<NotificationMessage>,
}

impl OperationMessages {
    pub fn new(in_progress: impl Into<NotificationMessage>) -> Self {
        Self {
            in_progress: in_progress.into(),
            done: None,
            failed: None,
        }
    }

    /// `<PREFIX>_IN_PROGRESS`, `<PREFIX>_DONE` and `<PREFIX>_FAILED` keys.
    pub fn keyed(prefix: &str) -> Self {
        Self {
            in_progress: format!("{}_IN_PROGRESS", prefix).into(),
            done: Some(format!("{}_DONE", prefix).into()),
            failed: Some(format!("{}_FAILED", prefix).into()),
        }
    }

    pub fn done(mut self, message: impl Into<NotificationMessage>) -> Self {
        self.done = Some(message.into());
        self
    }

    pub fn failed(mut self, message: impl Into<NotificationMessage>) -> Self {
        self.failed = Some(message.into());
        self
    }
}

// == Operation ==
/// A request plus how it should be tracked.
#[derive(Debug, Clone)]
pub struct Operation<R> {
    pub request: R,
    pub messages: OperationMessages,
    /// Notification id; generated when absent
    pub id: Option<String>,
    /// Overrides the poller defaults for this operation
    pub poll: Option<PollOptions>,
}

impl<R> Operation<R> {
    pub fn new(request: R, messages: OperationMessages) -> Self {
        Self {
            request,
            messages,
            id: None,
            poll: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_poll_options(mut self, options: PollOptions) -> Self {
        self.poll = Some(options);
        self
    }
}

// == Operation Report ==
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReport<T> {
    /// Notification id of the operation
    pub id: String,
    pub outcome: Result<T>,
}

// == Operation Handle ==
/// A running operation.
#[derive(Debug)]
pub struct OperationHandle<T> {
    id: String,
    cancel: CancellationToken,
    task: JoinHandle<OperationReport<T>>,
}

impl<T> OperationHandle<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stops waiting on the backend job. Nothing is reconciled and the
    /// notification is left as it is; the backend job itself keeps running.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> OperationReport<T> {
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                warn!(id = %self.id, error = %err, "Operation task ended abnormally");
                OperationReport {
                    id: self.id,
                    outcome: Err(OpsError::from(err)),
                }
            }
        }
    }
}

// == Operation Coordinator ==
#[derive(Clone)]
pub struct OperationCoordinator {
    tracker: Arc<JobNotificationTracker>,
    poller: AsyncJobPoller,
}

impl OperationCoordinator {
    pub fn new(tracker: Arc<JobNotificationTracker>, poller: AsyncJobPoller) -> Self {
        Self { tracker, poller }
    }

    pub fn tracker(&self) -> &Arc<JobNotificationTracker> {
        &self.tracker
    }

    pub fn poller(&self) -> &AsyncJobPoller {
        &self.poller
    }

    // == Run ==
    /// Starts a tracked operation without waiting for it.
    ///
    /// The pending notification is registered before anything is submitted;
    /// a [`OpsError::DuplicateId`] from that step is the only error returned
    /// here. Everything else is delivered through the notification, the
    /// `reconcile` callback and the returned handle.
    ///
    /// `reconcile` runs exactly once with the terminal outcome, before the
    /// notification is finished or failed, so observers reacting to the
    /// notification see the reconciled collection. A cancelled poll runs
    /// neither. If the operation task panics, the notification is failed
    /// with [`ErrorKind::Aborted`].
    pub fn run<R, T, S, C, F>(
        &self,
        operation: Operation<R>,
        submit: Arc<S>,
        status: Arc<C>,
        reconcile: F,
    ) -> Result<OperationHandle<T>>
    where
        R: Send + 'static,
        T: Send + 'static,
        S: Submit<R, T> + ?Sized + 'static,
        C: StatusCheck<T> + ?Sized + 'static,
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        let id = self
            .tracker
            .add(operation.messages.in_progress.clone(), operation.id.clone())?;
        let cancel = CancellationToken::new();
        let failed = operation.messages.failed.clone();

        let driver = tokio::spawn(self.clone().drive(
            id.clone(),
            operation,
            submit,
            status,
            reconcile,
            cancel.clone(),
        ));

        // A panicking driver must not leave the notification pending.
        let tracker = self.tracker.clone();
        let op_id = id.clone();
        let task = tokio::spawn(async move {
            match driver.await {
                Ok(report) => report,
                Err(err) => {
                    warn!(id = %op_id, error = %err, "Operation task ended abnormally");
                    let err = OpsError::from(err);
                    if err.kind() == ErrorKind::Aborted {
                        tracker.fail(&op_id, failed, Some(NotificationError::from(&err)));
                    }
                    OperationReport {
                        id: op_id,
                        outcome: Err(err),
                    }
                }
            }
        });

        Ok(OperationHandle { id, cancel, task })
    }

    async fn drive<R, T, S, C, F>(
        self,
        id: String,
        operation: Operation<R>,
        submit: Arc<S>,
        status: Arc<C>,
        reconcile: F,
        cancel: CancellationToken,
    ) -> OperationReport<T>
    where
        S: Submit<R, T> + ?Sized,
        C: StatusCheck<T> + ?Sized,
        F: FnOnce(&Result<T>),
    {
        let Operation {
            request,
            messages,
            poll,
            ..
        } = operation;

        let outcome = match submit.submit(request).await {
            Err(err) => {
                warn!(id = %id, error = %err, "Submit failed");
                Err(OpsError::SubmitFailure(err))
            }
            Ok(Submission::Immediate(value)) => Ok(value),
            Ok(Submission::Job(job)) => {
                info!(id = %id, job = %job, "Polling job");
                let options = poll.unwrap_or_else(|| self.poller.defaults().clone());
                self.poller
                    .poll(&job, status.as_ref(), &options, &cancel)
                    .await
            }
        };

        if matches!(outcome, Err(OpsError::Cancelled)) {
            info!(id = %id, "Operation poll cancelled, leaving state untouched");
            return OperationReport { id, outcome };
        }

        reconcile(&outcome);

        match &outcome {
            Ok(_) => {
                self.tracker.finish(&id, messages.done);
            }
            Err(err) => {
                self.tracker.fail(&id, messages.failed, Some(NotificationError::from(err)));
            }
        }

        OperationReport { id, outcome }
    }
}
