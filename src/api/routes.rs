//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    attach_volume_handler, clear_history_handler, config_reload_handler, config_value_handler,
    config_values_handler, create_volume_handler, delete_volume_handler, health_handler,
    list_volumes_handler, notifications_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Config loader and notification counters
/// - `GET /config?keys=a,b` - Several config values
/// - `GET /config/:key` - One config value
/// - `POST /config/reload` - Drop the cached config and load it again
/// - `GET /notifications` - Pending and recently resolved notifications
/// - `DELETE /notifications/history` - Forget resolved notifications
/// - `GET /volumes` - Spare drives with their pending state
/// - `POST /volumes` - Create a spare drive (202)
/// - `POST /volumes/:id/attach` - Attach a spare drive (202)
/// - `DELETE /volumes/:id` - Delete a spare drive (202)
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/config", get(config_values_handler))
        .route("/config/reload", post(config_reload_handler))
        .route("/config/:key", get(config_value_handler))
        .route("/notifications", get(notifications_handler))
        .route("/notifications/history", delete(clear_history_handler))
        .route("/volumes", get(list_volumes_handler).post(create_volume_handler))
        .route("/volumes/:id", delete(delete_volume_handler))
        .route("/volumes/:id/attach", post(attach_volume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let config = Config {
            config_dir: "does-not-exist".into(),
            ..Config::default()
        };
        create_router(AppState::from_config(&config))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        create_test_app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_config_file_is_bad_gateway() {
        let request = Request::builder().uri("/config/apiUrl").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_create_volume_is_accepted() {
        let request = Request::builder()
            .method("POST")
            .uri("/volumes")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"data","zoneId":"z1","diskOfferingId":"o1"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_delete_unknown_volume_not_found() {
        let request = Request::builder()
            .method("DELETE")
            .uri("/volumes/missing")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }
}
