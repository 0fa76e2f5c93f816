//! Volume Models
//!
//! Spare drives and the requests the backend accepts for them.

use serde::{Deserialize, Serialize};

use crate::ops::Identified;

// == Volume ==
/// A data disk. A volume without a virtual machine is a spare drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub zone_id: String,
    pub disk_offering_id: String,
    /// Requested size, when the disk offering is customizable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_id: Option<String>,
}

impl Volume {
    /// Builds the volume described by `creation` under the given id.
    pub fn from_creation(id: impl Into<String>, creation: &VolumeCreation) -> Self {
        Self {
            id: id.into(),
            name: creation.name.clone(),
            zone_id: creation.zone_id.clone(),
            disk_offering_id: creation.disk_offering_id.clone(),
            size_gb: creation.size_gb,
            virtual_machine_id: None,
        }
    }

    pub fn is_spare(&self) -> bool {
        self.virtual_machine_id.is_none()
    }
}

impl Identified for Volume {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

// == Requests ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCreation {
    pub name: String,
    pub zone_id: String,
    pub disk_offering_id: String,
    #[serde(default)]
    pub size_gb: Option<u64>,
}

impl VolumeCreation {
    /// Returns a description of the first invalid field, if any.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("name cannot be empty".to_string());
        }
        if self.zone_id.is_empty() {
            return Some("zoneId cannot be empty".to_string());
        }
        if self.disk_offering_id.is_empty() {
            return Some("diskOfferingId cannot be empty".to_string());
        }
        if self.size_gb == Some(0) {
            return Some("sizeGb must be positive".to_string());
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachment {
    pub volume_id: String,
    pub virtual_machine_id: String,
}

/// Everything the volume backend can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeRequest {
    Create(VolumeCreation),
    Attach(VolumeAttachment),
    Delete { id: String },
}
