//! Telemetry service: the single owner of device state and the live hub
//!
//! Store and hub are only reached through this type. Ingestion takes the store
//! write lock for upsert and publish together; subscribing takes the read lock
//! while it captures the snapshot and registers. A new subscriber therefore sees
//! every reading exactly once, either inside its snapshot or as a live event.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::net::SocketAddr;

use crate::config::AppConfig;
use crate::error::{ParseError, StoreError};
use crate::hub::{BroadcastHub, EventKind, HubEvent, Subscriber};
use crate::protocol::{parse_reading, Reading};
use crate::store::{
    vote_stats, DeviceList, DeviceStateView, DeviceStore, HistoryView, VoteStats,
};

pub struct TelemetryService {
    store: RwLock<DeviceStore>,
    hub: BroadcastHub,
    expiry: Duration,
    default_window_secs: i64,
}

impl TelemetryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: RwLock::new(DeviceStore::new(config.store.history_max)),
            hub: BroadcastHub::new(config.hub.subscriber_buffer),
            expiry: config.store.expiry(),
            default_window_secs: config.stats.default_window_secs,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Decode a datagram and, if valid, store and broadcast it
    ///
    /// A rejected datagram leaves state untouched and reaches no subscriber.
    pub fn ingest(&self, raw: &[u8], source: SocketAddr) -> Result<Reading, ParseError> {
        self.ingest_at(raw, source, Utc::now())
    }

    pub fn ingest_at(
        &self,
        raw: &[u8],
        source: SocketAddr,
        now: DateTime<Utc>,
    ) -> Result<Reading, ParseError> {
        let reading = parse_reading(raw, source, now)?;
        Ok(self.accept(reading))
    }

    /// Store and broadcast an already decoded reading
    pub fn accept(&self, reading: Reading) -> Reading {
        let mut store = self.store.write();
        let stored = store.upsert(reading).clone();
        self.hub.publish(&stored);
        stored
    }

    /// Register a live subscriber, primed with a snapshot of every device
    pub fn subscribe(&self, now: DateTime<Utc>) -> Result<Subscriber, serde_json::Error> {
        let store = self.store.read();
        let snapshot = HubEvent::new(EventKind::Snapshot, &self.device_list(&store, now))?;
        Ok(self.hub.subscribe_with(snapshot))
    }

    /// Every device, most recently observed first
    pub fn snapshot(&self, now: DateTime<Utc>) -> DeviceList {
        let store = self.store.read();
        self.device_list(&store, now)
    }

    pub fn device(&self, device: &str, now: DateTime<Utc>) -> Result<DeviceStateView, StoreError> {
        let store = self.store.read();
        let state = store.latest(device)?;
        Ok(DeviceStateView::from_state(state, now, self.expiry))
    }

    pub fn history(&self, device: &str) -> HistoryView {
        let entries = self.store.read().history(device);
        HistoryView::new(device, &entries)
    }

    /// Vote tally over the trailing window, or the configured default window
    pub fn vote_stats(&self, window_secs: Option<i64>, now: DateTime<Utc>) -> VoteStats {
        let window = window_secs.unwrap_or(self.default_window_secs);
        vote_stats(&self.store.read(), window, now)
    }

    pub fn device_count(&self) -> usize {
        self.store.read().len()
    }

    fn device_list(&self, store: &DeviceStore, now: DateTime<Utc>) -> DeviceList {
        DeviceList {
            devices: store
                .snapshot()
                .iter()
                .map(|state| DeviceStateView::from_state(state, now, self.expiry))
                .collect(),
        }
    }
}
