//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Notification retention: prunes old resolved notifications

mod retention;

pub use retention::spawn_retention_task;
