//! UDP receive loop
//!
//! The ingress task is the only writer of device state. Datagrams are handled
//! one at a time in socket order; a bad datagram is counted and dropped.

use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::udp::create_socket;
use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::service::TelemetryService;

/// Ingress counters, shared with the HTTP API
#[derive(Debug, Default)]
pub struct IngressStats {
    packets_received: AtomicU64,
    packets_accepted: AtomicU64,
    packets_rejected: AtomicU64,
    bytes_received: AtomicU64,
}

impl IngressStats {
    pub fn snapshot(&self) -> IngressStatsSnapshot {
        IngressStatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_accepted: self.packets_accepted.load(Ordering::Relaxed),
            packets_rejected: self.packets_rejected.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngressStatsSnapshot {
    pub packets_received: u64,
    pub packets_accepted: u64,
    pub packets_rejected: u64,
    pub bytes_received: u64,
}

/// UDP ingestion endpoint
pub struct UdpIngress {
    socket: UdpSocket,
    service: Arc<TelemetryService>,
    stats: Arc<IngressStats>,
    max_datagram_size: usize,
    stats_interval: Option<Duration>,
}

impl UdpIngress {
    /// Bind the ingress socket; failure here is fatal for the hub
    pub fn bind(config: &NetworkConfig, service: Arc<TelemetryService>) -> Result<Self, NetworkError> {
        let socket = create_socket(config.udp_addr(), config.recv_buffer_size)?;

        Ok(Self {
            socket,
            service,
            stats: Arc::new(IngressStats::default()),
            max_datagram_size: config.max_datagram_size,
            stats_interval: config.stats_interval(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> Arc<IngressStats> {
        self.stats.clone()
    }

    /// Receive until `shutdown` flips to true or its sender goes away
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // One spare byte tells an oversized datagram from one that fits exactly
        let mut buffer = vec![0u8; self.max_datagram_size + 1];
        let mut ticker = self.stats_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        if let Ok(addr) = self.socket.local_addr() {
            info!("UDP ingress listening on {}", addr);
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tick(&mut ticker) => self.log_stats(),
                result = self.socket.recv_from(&mut buffer) => match result {
                    Ok((len, source)) if len > self.max_datagram_size => self.reject_oversized(len, source),
                    Ok((len, source)) => self.handle_datagram(&buffer[..len], source),
                    // e.g. ICMP port-unreachable surfacing on some platforms
                    Err(e) => warn!("UDP receive error: {}", e),
                },
            }
        }

        info!("UDP ingress stopped");
        self.log_stats();
    }

    fn handle_datagram(&self, data: &[u8], source: SocketAddr) {
        match self.service.ingest(data, source) {
            Ok(reading) => {
                self.stats.packets_accepted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Reading from {} ({}): {:.2}C vote {}",
                    reading.device,
                    source,
                    reading.temperature_c,
                    reading.vote.value()
                );
            }
            Err(e) => {
                self.stats.packets_rejected.fetch_add(1, Ordering::Relaxed);
                debug!("Dropped packet from {}: {}", source, e);
            }
        }

        self.count_received(data.len());
    }

    /// `len` is what the socket delivered, at least one byte past the limit
    fn reject_oversized(&self, len: usize, source: SocketAddr) {
        self.stats.packets_rejected.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Dropped packet from {}: larger than {} bytes",
            source, self.max_datagram_size
        );
        self.count_received(len);
    }

    fn count_received(&self, len: usize) {
        self.stats
            .bytes_received
            .fetch_add(len as u64, Ordering::Relaxed);
        self.stats.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    fn log_stats(&self) {
        let stats = self.stats.snapshot();
        info!(
            "Ingress stats: {} packets, {} accepted, {} rejected, {:.1} KB, {} devices, {} subscribers",
            stats.packets_received,
            stats.packets_accepted,
            stats.packets_rejected,
            stats.bytes_received as f64 / 1024.0,
            self.service.device_count(),
            self.service.hub().subscriber_count()
        );
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
