//! API Handlers
//!
//! HTTP request handlers for configuration, notifications and spare drives.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::jobs::AsyncJobPoller;
use crate::loader::ConfigService;
use crate::models::{
    AcceptedResponse, AttachRequest, ClearedResponse, ConfigKeysQuery, ConfigResponse,
    ConfigValuesResponse, HealthResponse, NotificationsResponse, StatsResponse, VolumesResponse,
};
use crate::notify::JobNotificationTracker;
use crate::ops::OperationCoordinator;
use crate::volumes::{SimulatedVolumeBackend, SpareDriveService, VolumeAttachment, VolumeCreation};

type Result<T> = std::result::Result<T, ApiError>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigService,
    pub tracker: Arc<JobNotificationTracker>,
    pub volumes: SpareDriveService,
}

impl AppState {
    /// Wires handlers to existing services. The tracker is the one the
    /// spare-drive coordinator reports to.
    pub fn new(config: ConfigService, volumes: SpareDriveService) -> Self {
        Self {
            config,
            tracker: volumes.coordinator().tracker().clone(),
            volumes,
        }
    }

    /// Builds every service from configuration, backed by the simulated
    /// volume backend.
    pub fn from_config(config: &Config) -> Self {
        let tracker = Arc::new(JobNotificationTracker::new(config.notification_history));
        let coordinator = OperationCoordinator::new(tracker, AsyncJobPoller::new(config.poll_options()));
        let backend = Arc::new(SimulatedVolumeBackend::new(Duration::from_millis(
            config.simulated_job_ms,
        )));
        let volumes = SpareDriveService::new(coordinator, backend);
        let config_service = ConfigService::from_dir(config.config_dir.clone(), config.environment);
        Self::new(config_service, volumes)
    }
}

fn accepted(id: &str, message: &str) -> (StatusCode, Json<AcceptedResponse>) {
    (StatusCode::ACCEPTED, Json(AcceptedResponse::new(id, message)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.config.stats(),
        state.tracker.pending_count(),
        state.tracker.history().len(),
    ))
}

// == Configuration ==
/// Handler for GET /config/:key
pub async fn config_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ConfigResponse>> {
    let value = state
        .config
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("config key '{}'", key)))?;

    Ok(Json(ConfigResponse {
        environment: state.config.environment(),
        key,
        value,
    }))
}

/// Handler for GET /config?keys=a,b
pub async fn config_values_handler(
    State(state): State<AppState>,
    Query(query): Query<ConfigKeysQuery>,
) -> Result<Json<ConfigValuesResponse>> {
    let keys = query.keys();
    if keys.is_empty() {
        return Err(ApiError::InvalidRequest("keys cannot be empty".to_string()));
    }
    let values = state.config.get_many(&keys).await?;

    Ok(Json(ConfigValuesResponse {
        environment: state.config.environment(),
        values,
    }))
}

/// Handler for POST /config/reload
pub async fn config_reload_handler(State(state): State<AppState>) -> Result<Json<ConfigValuesResponse>> {
    let document = state.config.reload().await?;

    Ok(Json(ConfigValuesResponse {
        environment: state.config.environment(),
        values: document.values().cloned().collect(),
    }))
}

// == Notifications ==
/// Handler for GET /notifications
pub async fn notifications_handler(State(state): State<AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        pending: state.tracker.pending(),
        history: state.tracker.history(),
    })
}

/// Handler for DELETE /notifications/history
pub async fn clear_history_handler(State(state): State<AppState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.tracker.clear_history(),
    })
}

// == Spare Drives ==
/// Handler for GET /volumes
pub async fn list_volumes_handler(State(state): State<AppState>) -> Json<VolumesResponse> {
    Json(VolumesResponse {
        volumes: state.volumes.list(),
    })
}

/// Handler for POST /volumes
pub async fn create_volume_handler(
    State(state): State<AppState>,
    Json(req): Json<VolumeCreation>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let handle = state.volumes.create(req)?;
    Ok(accepted(handle.id(), "VOLUME_CREATE_IN_PROGRESS"))
}

/// Handler for POST /volumes/:id/attach
pub async fn attach_volume_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AttachRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let handle = state.volumes.attach(VolumeAttachment {
        volume_id: id,
        virtual_machine_id: req.virtual_machine_id,
    })?;
    Ok(accepted(handle.id(), "VOLUME_ATTACH_IN_PROGRESS"))
}

/// Handler for DELETE /volumes/:id
pub async fn delete_volume_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let handle = state.volumes.remove(&id)?;
    Ok(accepted(handle.id(), "VOLUME_DELETE_IN_PROGRESS"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::notify::NotificationStatus;
    use std::fs;

    fn state_with_config(document: &str) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config-dev.json"), document).unwrap();
        let config = Config {
            config_dir: dir.path().to_path_buf(),
            simulated_job_ms: 0,
            ..Config::default()
        };
        (AppState::from_config(&config), dir)
    }

    #[tokio::test]
    async fn test_config_value_handler() {
        let (state, _dir) = state_with_config(r#"{"apiUrl": "http://cloud.local"}"#);

        let response = config_value_handler(State(state.clone()), Path("apiUrl".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "http://cloud.local");
        assert_eq!(response.environment, Environment::Development);

        let missing = config_value_handler(State(state), Path("nope".to_string())).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_config_values_requires_keys() {
        let (state, _dir) = state_with_config("{}");
        let result = config_values_handler(State(state), Query(ConfigKeysQuery::default())).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_create_volume_registers_notification() {
        let (state, _dir) = state_with_config("{}");
        let req = VolumeCreation {
            name: "scratch".to_string(),
            zone_id: "zone-1".to_string(),
            disk_offering_id: "offering-1".to_string(),
            size_gb: None,
        };

        let (status, body) = create_volume_handler(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        let notification = state.tracker.get(&body.id).unwrap();
        assert_eq!(notification.status, NotificationStatus::Pending);
        assert_eq!(list_volumes_handler(State(state)).await.volumes.len(), 1);
    }

    #[tokio::test]
    async fn test_attach_rejects_blank_machine() {
        let (state, _dir) = state_with_config("{}");
        let req = AttachRequest {
            virtual_machine_id: "".to_string(),
        };
        let result = attach_volume_handler(State(state), Path("vol-1".to_string()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_volume() {
        let (state, _dir) = state_with_config("{}");
        let result = delete_volume_handler(State(state), Path("missing".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
