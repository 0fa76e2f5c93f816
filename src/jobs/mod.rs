//! Jobs Module
//!
//! Polls asynchronous backend jobs until they reach a terminal state.

mod poller;
mod status;

pub use poller::{AsyncJobPoller, Backoff, PollHandle, PollOptions};
pub use status::{JobHandle, JobStatus, Progress, StatusCheck};
