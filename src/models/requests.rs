//! Request DTOs for the HTTP API
//!
//! Volume creation bodies deserialize straight into
//! [`VolumeCreation`](crate::volumes::VolumeCreation).

use serde::Deserialize;

/// Request body for POST /volumes/:id/attach
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub virtual_machine_id: String,
}

impl AttachRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.virtual_machine_id.trim().is_empty() {
            return Some("virtualMachineId cannot be empty".to_string());
        }
        None
    }
}

/// Query for GET /config, e.g. `?keys=apiUrl,defaultZone`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigKeysQuery {
    #[serde(default)]
    pub keys: String,
}

impl ConfigKeysQuery {
    pub fn keys(&self) -> Vec<&str> {
        self.keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_request_deserialize() {
        let req: AttachRequest = serde_json::from_str(r#"{"virtualMachineId": "vm-1"}"#).unwrap();
        assert_eq!(req.virtual_machine_id, "vm-1");
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_attach_request_rejects_blank_machine() {
        let req = AttachRequest {
            virtual_machine_id: " ".to_string(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_config_keys_split() {
        let query = ConfigKeysQuery {
            keys: "a, b,,c".to_string(),
        };
        assert_eq!(query.keys(), vec!["a", "b", "c"]);
        assert!(ConfigKeysQuery::default().keys().is_empty());
    }
}
