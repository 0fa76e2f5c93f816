//! Volumes Module
//!
//! Spare-drive management on top of the operation coordinator.

mod backend;
mod model;
mod service;

pub use backend::{SimulatedVolumeBackend, FAILURE_PREFIX};
pub use model::{Volume, VolumeAttachment, VolumeCreation, VolumeRequest};
pub use service::SpareDriveService;
