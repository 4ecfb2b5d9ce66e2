//! HTTP API integration tests, driving the router in-process

use axum::{
    body::{to_bytes, Body, BodyDataStream},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use lan_vote_hub::{
    config::AppConfig,
    network::IngressStats,
    ui::{router, AppState},
    TelemetryService,
};

fn setup() -> (Router, Arc<TelemetryService>) {
    let service = Arc::new(TelemetryService::new(&AppConfig::default()));
    let state = AppState::new(service.clone(), Arc::new(IngressStats::default()));
    (router(Arc::new(state)), service)
}

fn device_addr() -> SocketAddr {
    "192.168.137.50:50123".parse().unwrap()
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup();
    let (status, body) = get_json(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["time"].as_f64().unwrap() > 1_600_000_000.0);
}

#[tokio::test]
async fn test_unknown_device_is_404() {
    let (app, _) = setup();
    let (status, body) = get_json(&app, "/api/temps/unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({"error": "not found", "device": "unknown"}));
}

#[tokio::test]
async fn test_device_listing_keeps_offline_devices() {
    let (app, service) = setup();
    let now = Utc::now();
    service
        .ingest_at(b"attic:temp:31.0:vote:1", device_addr(), now - Duration::hours(3))
        .unwrap();
    service
        .ingest_at(b"office:temp:22.5:vote:0", device_addr(), now)
        .unwrap();

    let (status, body) = get_json(&app, "/api/temps").await;
    assert_eq!(status, StatusCode::OK);

    let devices = body["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["device"], "office");
    assert_eq!(devices[0]["online"], true);
    assert_eq!(devices[1]["device"], "attic");
    assert_eq!(devices[1]["online"], false);
    assert_eq!(devices[1]["vote_tag"], "warm");
    assert_eq!(devices[1]["ip"], "192.168.137.50");
    assert_eq!(devices[1]["port"], 50123);
}

#[tokio::test]
async fn test_single_device_and_history() {
    let (app, service) = setup();
    service.ingest(b"ab12:temp:23.50:vote:1", device_addr()).unwrap();
    service.ingest(b"ab12:temp:24.10:vote:-1", device_addr()).unwrap();

    let (status, body) = get_json(&app, "/api/temps/ab12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["temp"], 24.1);
    assert_eq!(body["vote"], -1);
    assert_eq!(body["vote_tag"], "cold");
    assert!(body["iso8601"].as_str().unwrap().ends_with('Z'));

    let (status, body) = get_json(&app, "/api/temps/ab12/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"], "ab12");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["temp"], 23.5);
    assert_eq!(history[0]["vote_tag"], "warm");
    assert_eq!(history[1]["vote_tag"], "cold");
}

#[tokio::test]
async fn test_history_of_unknown_device_is_empty() {
    let (app, _) = setup();
    let (status, body) = get_json(&app, "/api/temps/ghost/history").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"], "ghost");
    assert_eq!(body["history"], serde_json::json!([]));
}

#[tokio::test]
async fn test_vote_stats() {
    let (app, service) = setup();
    service.ingest(b"ab12:temp:23.50:vote:1", device_addr()).unwrap();
    service.ingest(b"ab12:temp:24.10:vote:-1", device_addr()).unwrap();
    service.ingest(b"cd34:temp:20.00:vote:0", device_addr()).unwrap();

    let (status, body) = get_json(&app, "/api/vote_stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["window"], 600);
    assert_eq!(body["total"], serde_json::json!({"warm": 0, "comfortable": 1, "cold": 1}));
    assert_eq!(body["per_device"]["ab12"], "cold");
    assert_eq!(body["per_device"]["cd34"], "comfortable");
    assert_eq!(body["device_count"], 2);

    let (_, body) = get_json(&app, "/api/vote_stats?window=30").await;
    assert_eq!(body["window"], 30);

    let (status, body) = get_json(&app, "/api/vote_stats?window=soon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["window"], 600);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, service) = setup();
    service.ingest(b"ab12:temp:23.50:vote:1", device_addr()).unwrap();

    let (status, body) = get_json(&app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["devices"], 1);
    assert_eq!(body["subscribers"], 0);
    assert_eq!(body["packets_received"], 0);
}

#[tokio::test]
async fn test_cors_headers() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::get("/api/health")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_bare_options_request_is_ok() {
    let (app, _) = setup();
    for uri in ["/api/temps", "/api/temps/ab12/history", "/anything/else"] {
        let response = app
            .clone()
            .oneshot(
                Request::options(uri)
                    .header(header::ORIGIN, "http://dashboard.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}

#[tokio::test]
async fn test_preflight_allows_get() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::options("/api/temps")
                .header(header::ORIGIN, "http://dashboard.local")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("GET"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (app, _) = setup();
    let response = app
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Read one `event:`/`data:` frame, skipping keep-alive comments
async fn next_frame(body: &mut BodyDataStream) -> (String, Value) {
    let mut text = String::new();
    loop {
        while let Some(end) = text.find("\n\n") {
            let frame: String = text.drain(..end + 2).collect();
            let mut event = None;
            let mut data = String::new();
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(chunk) = line.strip_prefix("data:") {
                    data.push_str(chunk.trim_start());
                }
            }
            if let Some(event) = event {
                return (event, serde_json::from_str(&data).unwrap());
            }
        }

        let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), body.next())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("SSE stream ended")
            .unwrap();
        text.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn test_sse_snapshot_then_readings() {
    let (app, service) = setup();
    service.ingest(b"aa:temp:20.0:vote:0", device_addr()).unwrap();
    service.ingest(b"bb:temp:21.0:vote:1", device_addr()).unwrap();
    service.ingest(b"aa:temp:22.5:vote:-1", device_addr()).unwrap();

    let response = app
        .oneshot(Request::get("/api/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(service.hub().subscriber_count(), 1);

    let mut body = response.into_body().into_data_stream();

    let (event, snapshot) = next_frame(&mut body).await;
    assert_eq!(event, "snapshot");
    let devices = snapshot["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    let aa = devices.iter().find(|d| d["device"] == "aa").unwrap();
    assert_eq!(aa["temp"], 22.5);
    assert_eq!(aa["vote"], -1);
    assert_eq!(aa["vote_tag"], "cold");

    service.ingest(b"cc:temp:19.5:vote:-1", device_addr()).unwrap();
    let (event, reading) = next_frame(&mut body).await;
    assert_eq!(event, "reading");
    assert_eq!(reading["device"], "cc");
    assert_eq!(reading["vote_tag"], "cold");

    // Dropping the connection unregisters the subscriber
    drop(body);
    assert_eq!(service.hub().subscriber_count(), 0);
}

#[tokio::test]
async fn test_sse_ends_when_hub_closes() {
    let (app, service) = setup();
    let response = app
        .clone()
        .oneshot(Request::get("/api/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();

    let (event, snapshot) = next_frame(&mut body).await;
    assert_eq!(event, "snapshot");
    assert_eq!(snapshot["devices"], serde_json::json!([]));

    service.hub().close_all();
    let end = tokio::time::timeout(std::time::Duration::from_secs(2), body.next())
        .await
        .unwrap();
    assert!(end.is_none());

    // A stream opened after shutdown began ends after its snapshot
    let response = app
        .oneshot(Request::get("/api/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    let (event, _) = next_frame(&mut body).await;
    assert_eq!(event, "snapshot");
    let end = tokio::time::timeout(std::time::Duration::from_secs(2), body.next())
        .await
        .unwrap();
    assert!(end.is_none());
}
