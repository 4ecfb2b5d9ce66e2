//! HTTP API handlers

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::network::IngressStatsSnapshot;
use crate::protocol::epoch_seconds;
use crate::store::{DeviceList, DeviceStateView, HistoryView, VoteStats};
use crate::ui::server::AppState;

/// Error responses of the API
#[derive(Debug)]
pub enum ApiError {
    DeviceNotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(device) => ApiError::DeviceNotFound(device),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::DeviceNotFound(device) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "not found", "device": device })),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                tracing::error!("Internal API error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": msg })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub time: f64,
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: epoch_seconds(Utc::now()),
    })
}

/// Bare `OPTIONS` on an API path; the CORS layer adds the headers
pub async fn options_ok() -> StatusCode {
    StatusCode::OK
}

/// Unrouted paths: `OPTIONS` still succeeds, anything else is 404
pub async fn fallback(method: Method) -> StatusCode {
    if method == Method::OPTIONS {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Latest state of every device, newest first
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Json<DeviceList> {
    Json(state.service.snapshot(Utc::now()))
}

/// Latest state of one device
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(device): Path<String>,
) -> Result<Json<DeviceStateView>, ApiError> {
    Ok(Json(state.service.device(&device, Utc::now())?))
}

/// Stored history of one device; empty for unknown devices
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(device): Path<String>,
) -> Json<HistoryView> {
    Json(state.service.history(&device))
}

#[derive(Debug, Deserialize)]
pub struct VoteStatsQuery {
    /// Kept as text so a malformed value falls back to the default window
    pub window: Option<String>,
}

impl VoteStatsQuery {
    fn window_secs(&self) -> Option<i64> {
        self.window.as_deref().and_then(|w| w.trim().parse().ok())
    }
}

/// One-vote-per-device tally over a trailing window
pub async fn get_vote_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoteStatsQuery>,
) -> Json<VoteStats> {
    Json(state.service.vote_stats(query.window_secs(), Utc::now()))
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub ingress: IngressStatsSnapshot,
    pub devices: usize,
    pub subscribers: usize,
}

/// Ingress counters and live subscriber count
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        ingress: state.ingress.snapshot(),
        devices: state.service.device_count(),
        subscribers: state.service.hub().subscriber_count(),
    })
}
