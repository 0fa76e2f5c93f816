//! Integration Tests for API Endpoints
//!
//! Drives the full router: configuration lookups, notifications and the
//! spare-drive operations end to end against the simulated backend.

use std::fs;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use opstrack::{api::create_router, jobs::Backoff, AppState, Config};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config-dev.json"),
        r#"{"sessionRefreshInterval": 60, "apiUrl": "http://cloud.local/client/api", "defaultZone": "zone-1"}"#,
    )
    .unwrap();

    let config = Config {
        config_dir: dir.path().to_path_buf(),
        poll_interval_ms: 20,
        poll_backoff: Backoff::None,
        simulated_job_ms: 50,
        ..Config::default()
    };
    (create_router(AppState::from_config(&config)), dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

/// Polls GET /notifications until `id` is resolved and returns it.
async fn wait_resolved(app: &Router, id: &str) -> Value {
    for _ in 0..200 {
        let (_, json) = get(app, "/notifications").await;
        if let Some(found) = json["history"]
            .as_array()
            .and_then(|h| h.iter().find(|n| n["id"] == id))
        {
            return found.clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("notification {} never resolved", id);
}

fn volume_body(name: &str) -> String {
    format!(r#"{{"name":"{}","zoneId":"zone-1","diskOfferingId":"offering-1","sizeGb":20}}"#, name)
}

// == Health & Stats ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = create_test_app();
    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_stats_reflect_cached_config() {
    let (app, _dir) = create_test_app();

    get(&app, "/config/apiUrl").await;
    get(&app, "/config/defaultZone").await;

    let (status, json) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["loader"]["fetches"], 1);
    assert_eq!(json["loader"]["hits"], 1);
    assert_eq!(json["loader"]["misses"], 1);
    assert_eq!(json["pending_notifications"], 0);
}

// == Configuration ==

#[tokio::test]
async fn test_config_value() {
    let (app, _dir) = create_test_app();
    let (status, json) = get(&app, "/config/defaultZone").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "defaultZone");
    assert_eq!(json["value"], "zone-1");
    assert_eq!(json["environment"], "development");
}

#[tokio::test]
async fn test_config_missing_key() {
    let (app, _dir) = create_test_app();
    let (status, json) = get(&app, "/config/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_config_many_values_in_document_order() {
    let (app, _dir) = create_test_app();
    let (status, json) = get(&app, "/config?keys=apiUrl,sessionRefreshInterval,unknown").await;

    assert_eq!(status, StatusCode::OK);
    let values = json["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], 60);
    assert_eq!(values[1], "http://cloud.local/client/api");
}

#[tokio::test]
async fn test_config_reload_picks_up_changes() {
    let (app, dir) = create_test_app();
    get(&app, "/config/defaultZone").await;

    fs::write(dir.path().join("config-dev.json"), r#"{"defaultZone": "zone-2"}"#).unwrap();
    let (_, cached) = get(&app, "/config/defaultZone").await;
    assert_eq!(cached["value"], "zone-1");

    let (status, _) = send(&app, "POST", "/config/reload", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, fresh) = get(&app, "/config/defaultZone").await;
    assert_eq!(fresh["value"], "zone-2");
}

#[tokio::test]
async fn test_unreadable_config_reports_fetch_failure() {
    let (app, dir) = create_test_app();
    fs::write(dir.path().join("config-dev.json"), "not json").unwrap();

    let (status, json) = get(&app, "/config/apiUrl").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "fetch_failure");
    assert!(json["error"].as_str().unwrap().contains("Unable to access config file"));
}

// == Spare Drives ==

#[tokio::test]
async fn test_create_volume_end_to_end() {
    let (app, _dir) = create_test_app();

    let (status, accepted) = send(&app, "POST", "/volumes", Some(&volume_body("scratch"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = accepted["id"].as_str().unwrap().to_string();

    let (_, listed) = get(&app, "/volumes").await;
    assert_eq!(listed["volumes"][0]["state"], "provisional");
    assert_eq!(listed["volumes"][0]["operation_id"], id.as_str());

    let notification = wait_resolved(&app, &id).await;
    assert_eq!(notification["status"], "succeeded");
    assert_eq!(notification["message"], "VOLUME_CREATE_DONE");

    let (_, listed) = get(&app, "/volumes").await;
    let volumes = listed["volumes"].as_array().unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0]["state"], "confirmed");
    assert_eq!(volumes[0]["item"]["name"], "scratch");
    assert_ne!(volumes[0]["item"]["id"], id.as_str());
}

#[tokio::test]
async fn test_failed_create_rolls_back() {
    let (app, _dir) = create_test_app();

    let (_, accepted) = send(&app, "POST", "/volumes", Some(&volume_body("fail-disk"))).await;
    let id = accepted["id"].as_str().unwrap().to_string();

    let notification = wait_resolved(&app, &id).await;
    assert_eq!(notification["status"], "failed");
    assert_eq!(notification["error"]["kind"], "job_failed");
    assert_eq!(
        notification["error"]["transport"]["details"]["createvolumeresponse"]["errortext"],
        "Failed to create volume fail-disk"
    );
    assert_eq!(notification["message"], "VOLUME_CREATE_FAILED");

    let (_, listed) = get(&app, "/volumes").await;
    assert!(listed["volumes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_invalid_volume() {
    let (app, _dir) = create_test_app();
    let (status, _) = send(&app, "POST", "/volumes", Some(&volume_body(""))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, notifications) = get(&app, "/notifications").await;
    assert!(notifications["pending"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attach_then_delete() {
    let (app, _dir) = create_test_app();

    for name in ["first", "second"] {
        let (_, accepted) = send(&app, "POST", "/volumes", Some(&volume_body(name))).await;
        wait_resolved(&app, accepted["id"].as_str().unwrap()).await;
    }
    let (_, listed) = get(&app, "/volumes").await;
    let first = listed["volumes"][0]["item"]["id"].as_str().unwrap().to_string();
    let second = listed["volumes"][1]["item"]["id"].as_str().unwrap().to_string();

    let (status, accepted) = send(
        &app,
        "POST",
        &format!("/volumes/{}/attach", first),
        Some(r#"{"virtualMachineId":"vm-1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let attached = wait_resolved(&app, accepted["id"].as_str().unwrap()).await;
    assert_eq!(attached["message"], "VOLUME_ATTACH_DONE");

    let (status, accepted) = send(&app, "DELETE", &format!("/volumes/{}", second), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let deleted = wait_resolved(&app, accepted["id"].as_str().unwrap()).await;
    assert_eq!(deleted["message"], "VOLUME_DELETE_DONE");

    let (_, listed) = get(&app, "/volumes").await;
    assert!(listed["volumes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attach_unknown_volume() {
    let (app, _dir) = create_test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/volumes/missing/attach",
        Some(r#"{"virtualMachineId":"vm-1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_volume() {
    let (app, _dir) = create_test_app();
    let (status, json) = send(&app, "DELETE", "/volumes/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}

// == Notifications ==

#[tokio::test]
async fn test_clear_notification_history() {
    let (app, _dir) = create_test_app();

    let (_, accepted) = send(&app, "POST", "/volumes", Some(&volume_body("scratch"))).await;
    wait_resolved(&app, accepted["id"].as_str().unwrap()).await;

    let (status, json) = send(&app, "DELETE", "/notifications/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleared"], 1);

    let (_, notifications) = get(&app, "/notifications").await;
    assert!(notifications["history"].as_array().unwrap().is_empty());
}
