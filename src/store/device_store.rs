//! Per-device latest state and bounded history
//!
//! The store is a plain map owned by a single writer. Concurrency is handled
//! one level up by the service, which wraps it in a reader-writer lock.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::error::StoreError;
use crate::protocol::{DeviceId, Reading, Vote};

/// Latest accepted reading of a device
pub type DeviceState = Reading;

/// One history sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub vote: Vote,
}

impl From<&Reading> for HistoryEntry {
    fn from(reading: &Reading) -> Self {
        Self {
            observed_at: reading.observed_at,
            temperature_c: reading.temperature_c,
            vote: reading.vote,
        }
    }
}

/// Everything the store knows about one device
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub(crate) latest: DeviceState,
    /// Oldest first, never longer than the store's history bound
    pub(crate) history: VecDeque<HistoryEntry>,
}

impl DeviceRecord {
    pub fn latest(&self) -> &DeviceState {
        &self.latest
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }
}

/// Device state table
pub struct DeviceStore {
    devices: HashMap<DeviceId, DeviceRecord>,
    history_max: usize,
}

impl DeviceStore {
    /// Create an empty store keeping at most `history_max` samples per device
    pub fn new(history_max: usize) -> Self {
        Self {
            devices: HashMap::new(),
            history_max: history_max.max(1),
        }
    }

    /// Record a reading as the device's latest state and append it to history
    ///
    /// If the clock stepped backwards since the previous sample, the reading is
    /// stamped with the previous sample's time so history stays ordered.
    /// Returns the reading as stored.
    pub fn upsert(&mut self, mut reading: Reading) -> &DeviceState {
        let history_max = self.history_max;
        let record = self
            .devices
            .entry(reading.device.clone())
            .or_insert_with(|| DeviceRecord {
                latest: reading.clone(),
                history: VecDeque::with_capacity(history_max.min(64)),
            });

        if let Some(last) = record.history.back() {
            if reading.observed_at < last.observed_at {
                reading.observed_at = last.observed_at;
            }
        }

        record.history.push_back(HistoryEntry::from(&reading));
        while record.history.len() > history_max {
            record.history.pop_front();
        }
        record.latest = reading;

        &record.latest
    }

    /// Latest state of one device
    pub fn latest(&self, device: &str) -> Result<&DeviceState, StoreError> {
        self.devices
            .get(device)
            .map(|record| &record.latest)
            .ok_or_else(|| StoreError::NotFound(device.to_string()))
    }

    /// Latest state of every device, most recently observed first
    pub fn snapshot(&self) -> Vec<DeviceState> {
        let mut states: Vec<DeviceState> = self
            .devices
            .values()
            .map(|record| record.latest.clone())
            .collect();

        states.sort_by(|a, b| {
            b.observed_at
                .cmp(&a.observed_at)
                .then_with(|| a.device.cmp(&b.device))
        });
        states
    }

    /// History of one device, oldest first; empty for unknown devices
    pub fn history(&self, device: &str) -> Vec<HistoryEntry> {
        self.devices
            .get(device)
            .map(|record| record.history.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reading(device: &str, temp: f64, vote: Vote, at: DateTime<Utc>) -> Reading {
        Reading {
            device: device.to_string(),
            temperature_c: temp,
            vote,
            observed_at: at,
            source: "10.0.0.2:40000".parse().unwrap(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_upsert_replaces_latest() {
        let mut store = DeviceStore::new(10);
        store.upsert(reading("ab12", 23.5, Vote::Warm, t0()));
        store.upsert(reading("ab12", 24.1, Vote::Cold, t0() + Duration::seconds(2)));

        assert_eq!(store.len(), 1);
        let latest = store.latest("ab12").unwrap();
        assert_eq!(latest.temperature_c, 24.1);
        assert_eq!(latest.vote, Vote::Cold);
        assert_eq!(store.history("ab12").len(), 2);
    }

    #[test]
    fn test_history_bound_drops_oldest() {
        let history_max = 5;
        let mut store = DeviceStore::new(history_max);

        for i in 0..=history_max {
            let at = t0() + Duration::seconds(i as i64);
            store.upsert(reading("dev", i as f64, Vote::Comfortable, at));
        }

        let history = store.history("dev");
        assert_eq!(history.len(), history_max);
        // Exactly the first sample was dropped
        assert_eq!(history[0].temperature_c, 1.0);
        assert_eq!(history[history_max - 1].temperature_c, history_max as f64);
    }

    #[test]
    fn test_zero_bound_keeps_latest_sample() {
        let mut store = DeviceStore::new(0);
        store.upsert(reading("dev", 20.0, Vote::Warm, t0()));
        store.upsert(reading("dev", 21.0, Vote::Cold, t0() + Duration::seconds(1)));

        let history = store.history("dev");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].temperature_c, 21.0);
    }

    #[test]
    fn test_history_never_exceeds_bound() {
        let mut store = DeviceStore::new(3);
        for i in 0..100 {
            store.upsert(reading("dev", 20.0, Vote::Warm, t0() + Duration::seconds(i)));
            assert!(store.history("dev").len() <= 3);
        }
    }

    #[test]
    fn test_clock_step_back_keeps_history_ordered() {
        let mut store = DeviceStore::new(10);
        store.upsert(reading("dev", 20.0, Vote::Warm, t0()));
        let stored = store
            .upsert(reading("dev", 21.0, Vote::Cold, t0() - Duration::seconds(30)))
            .clone();

        assert_eq!(stored.observed_at, t0());
        let history = store.history("dev");
        assert!(history.windows(2).all(|w| w[0].observed_at <= w[1].observed_at));
    }

    #[test]
    fn test_latest_unknown_device() {
        let store = DeviceStore::new(10);
        assert_eq!(
            store.latest("nope").unwrap_err(),
            StoreError::NotFound("nope".into())
        );
        assert!(store.history("nope").is_empty());
    }

    #[test]
    fn test_snapshot_newest_first() {
        let mut store = DeviceStore::new(10);
        store.upsert(reading("old", 18.0, Vote::Cold, t0()));
        store.upsert(reading("new", 25.0, Vote::Warm, t0() + Duration::seconds(60)));
        store.upsert(reading("mid", 21.0, Vote::Comfortable, t0() + Duration::seconds(30)));

        let order: Vec<String> = store.snapshot().into_iter().map(|s| s.device).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
    }
}
