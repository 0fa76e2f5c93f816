//! opstrack - Tracking for long-running backend operations
//!
//! Single-flight cached loading, job status polling, operation
//! notifications and optimistic collection reconciliation, served over a
//! small HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod loader;
pub mod models;
pub mod notify;
pub mod ops;
pub mod tasks;
pub mod volumes;

pub use api::AppState;
pub use config::Config;
pub use error::{ApiError, ErrorKind, OpsError, Result, TransportError, VolumeError};
pub use tasks::spawn_retention_task;
