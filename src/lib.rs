//! # LAN Vote Hub
//!
//! Collects temperature and comfort-vote reports from room sensors over UDP,
//! keeps the latest state and a bounded history per device, and serves it over
//! HTTP with a live server-sent event stream.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ Sensor A │ │ Sensor B │ │ Sensor C │   "<id>:temp:<float>:vote:<int>"
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      └────────────┼────────────┘  UDP, one datagram per reading
//!                   ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            UDP Ingress (network::ingress) - single writer    │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TelemetryService (service)                   │
//! │  ┌──────────────┐   ┌─────────────────┐   ┌──────────────┐  │
//! │  │ Packet parse │──▶│  DeviceStore    │──▶│ BroadcastHub │  │
//! │  │ (protocol)   │   │  latest+history │   │ (hub)        │  │
//! │  └──────────────┘   └───────┬─────────┘   └──────┬───────┘  │
//! └─────────────────────────────┼────────────────────┼──────────┘
//!                               ▼                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HTTP API (ui::handlers)          Live stream (ui::sse)      │
//! │  /api/temps  /api/vote_stats      /api/sse                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod hub;
pub mod network;
pub mod protocol;
pub mod service;
pub mod store;
pub mod ui;

pub use error::{Error, Result};
pub use service::TelemetryService;

/// Application-wide constants
pub mod constants {
    /// Default UDP port devices report to
    pub const DEFAULT_UDP_PORT: u16 = 8080;

    /// Default HTTP port for the API
    pub const DEFAULT_HTTP_PORT: u16 = 5000;

    /// Largest UDP payload over IPv4, the default datagram limit
    pub const MAX_UDP_PAYLOAD: usize = 65507;

    /// Single-frame datagram size, for deployments that want to refuse fragments
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers

    /// History samples kept per device
    pub const DEFAULT_HISTORY_MAX: usize = 200;

    /// A device with no report for this long is shown offline
    pub const DEFAULT_EXPIRY_SECS: u64 = 60 * 60;

    /// Default vote statistics window
    pub const DEFAULT_VOTE_WINDOW_SECS: i64 = 600;

    /// Events buffered per live subscriber
    pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

    /// Cap for configured durations (ten years)
    pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;
}
