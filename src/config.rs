//! Application configuration
//!
//! Every section has defaults, so an empty or missing file is a valid config.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub ui: UiConfig,
    pub store: StoreConfig,
    pub stats: StatsConfig,
    pub hub: HubConfig,
}

/// UDP ingress settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: IpAddr,
    pub udp_port: u16,
    /// Largest datagram accepted; longer ones are counted as rejected
    pub max_datagram_size: usize,
    /// SO_RCVBUF override, OS default when unset
    pub recv_buffer_size: Option<usize>,
    /// Seconds between ingress stats log lines, 0 disables them
    pub stats_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            udp_port: DEFAULT_UDP_PORT,
            max_datagram_size: MAX_UDP_PAYLOAD,
            recv_buffer_size: None,
            stats_interval_secs: 60,
        }
    }
}

impl NetworkConfig {
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.udp_port)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bind_address: IpAddr,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl UiConfig {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }
}

/// Device store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// History samples kept per device
    pub history_max: usize,
    /// Seconds without a report before a device shows as offline
    pub expiry_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_max: DEFAULT_HISTORY_MAX,
            expiry_secs: DEFAULT_EXPIRY_SECS,
        }
    }
}

impl StoreConfig {
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_secs.min(MAX_DURATION_SECS) as i64)
    }
}

/// Vote statistics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Window used when a request does not name one
    pub default_window_secs: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_window_secs: DEFAULT_VOTE_WINDOW_SECS,
        }
    }
}

/// Live stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Events buffered per subscriber before it is evicted
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// used when present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    tracing::info!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        tracing::info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(&path)?;
        Self::from_toml(&text)
    }

    /// Per-user config location, e.g. `~/.config/lan-vote-hub/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lan-vote-hub")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.history_max == 0 {
            return Err(Error::Config("store.history_max must be at least 1".into()));
        }
        if self.store.expiry_secs > MAX_DURATION_SECS {
            return Err(Error::Config(format!(
                "store.expiry_secs must not exceed {}",
                MAX_DURATION_SECS
            )));
        }
        if self.stats.default_window_secs < 1 {
            return Err(Error::Config("stats.default_window_secs must be positive".into()));
        }
        if self.hub.subscriber_buffer == 0 {
            return Err(Error::Config("hub.subscriber_buffer must be at least 1".into()));
        }
        if self.network.max_datagram_size == 0 || self.network.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(Error::Config(format!(
                "network.max_datagram_size must be between 1 and {}",
                MAX_UDP_PAYLOAD
            )));
        }
        Ok(())
    }
}
