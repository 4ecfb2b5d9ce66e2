//! HTTP server setup

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use super::{handlers, sse};
use crate::config::UiConfig;
use crate::error::NetworkError;
use crate::network::IngressStats;
use crate::service::TelemetryService;

/// Shared state handed to every handler
pub struct AppState {
    pub service: Arc<TelemetryService>,
    pub ingress: Arc<IngressStats>,
}

impl AppState {
    pub fn new(service: Arc<TelemetryService>, ingress: Arc<IngressStats>) -> Self {
        Self { service, ingress }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(handlers::health).options(handlers::options_ok))
        .route("/api/temps", get(handlers::list_devices).options(handlers::options_ok))
        .route(
            "/api/temps/:device",
            get(handlers::get_device).options(handlers::options_ok),
        )
        .route(
            "/api/temps/:device/history",
            get(handlers::get_history).options(handlers::options_ok),
        )
        .route(
            "/api/vote_stats",
            get(handlers::get_vote_stats).options(handlers::options_ok),
        )
        .route("/api/stats", get(handlers::get_stats).options(handlers::options_ok))
        .route("/api/sse", get(sse::live_stream).options(handlers::options_ok))
        .fallback(handlers::fallback)
        .layer(cors)
        .with_state(state)
}

/// HTTP API server
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: UiConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Bind the listening socket; failure here is fatal for the hub
    pub async fn bind(&self) -> Result<TcpListener, NetworkError> {
        let addr = self.config.http_addr();
        TcpListener::bind(addr)
            .await
            .map_err(|e| NetworkError::ListenFailed(format!("{}: {}", addr, e)))
    }

    /// Serve until `shutdown` flips to true
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("HTTP API listening on http://{}", addr);
        }

        let app = router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                while !*shutdown.borrow() {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
    }
}
