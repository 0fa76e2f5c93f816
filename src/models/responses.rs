//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::config::Environment;
use crate::loader::LoaderStats;
use crate::notify::Notification;
use crate::ops::TrackedEntry;
use crate::volumes::Volume;

/// Response body for operation endpoints (202 Accepted).
///
/// `id` is the notification tracking the operation.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub id: String,
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Response body for GET /config/:key
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub environment: Environment,
    pub key: String,
    pub value: Value,
}

/// Response body for GET /config and POST /config/reload
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValuesResponse {
    pub environment: Environment,
    pub values: Vec<Value>,
}

/// Response body for GET /notifications
#[derive(Debug, Clone, Serialize)]
pub struct NotificationsResponse {
    /// Unresolved notifications, oldest first
    pub pending: Vec<Notification>,
    /// Resolved notifications, newest first
    pub history: Vec<Notification>,
}

/// Response body for DELETE /notifications/history
#[derive(Debug, Clone, Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

/// Response body for GET /volumes
#[derive(Debug, Clone, Serialize)]
pub struct VolumesResponse {
    pub volumes: Vec<TrackedEntry<Volume>>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Config loader counters
    pub loader: LoaderStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Notifications still waiting on their operation
    pub pending_notifications: usize,
    /// Resolved notifications retained
    pub history_size: usize,
}

impl StatsResponse {
    pub fn new(loader: LoaderStats, pending_notifications: usize, history_size: usize) -> Self {
        Self {
            hit_rate: loader.hit_rate(),
            loader,
            pending_notifications,
            history_size,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let loader = LoaderStats {
            hits: 3,
            misses: 1,
            fetches: 1,
            failures: 0,
            cached_entries: 1,
        };
        let resp = StatsResponse::new(loader, 2, 5);
        assert!((resp.hit_rate - 0.75).abs() < 0.001);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["loader"]["fetches"], 1);
        assert_eq!(json["pending_notifications"], 2);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_accepted_response_serialize() {
        let json = serde_json::to_value(AcceptedResponse::new("op-1", "VOLUME_CREATE_IN_PROGRESS")).unwrap();
        assert_eq!(json["id"], "op-1");
    }
}
