//! JSON views over stored state
//!
//! Online status is derived here, at read time, from the caller's clock.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::device_store::{DeviceState, HistoryEntry};
use crate::protocol::{epoch_seconds, DeviceId, Vote, VoteTag};

/// Public representation of a device's latest state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStateView {
    pub device: DeviceId,
    pub temp: f64,
    pub vote: Vote,
    pub vote_tag: VoteTag,
    pub ts: f64,
    pub iso8601: String,
    pub online: bool,
    pub ip: String,
    pub port: u16,
}

impl DeviceStateView {
    pub fn from_state(state: &DeviceState, now: DateTime<Utc>, expiry: Duration) -> Self {
        Self {
            device: state.device.clone(),
            temp: state.temperature_c,
            vote: state.vote,
            vote_tag: state.vote.tag(),
            ts: state.epoch_seconds(),
            iso8601: state.observed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            online: is_online(state.observed_at, now, expiry),
            ip: state.source.ip().to_string(),
            port: state.source.port(),
        }
    }
}

/// A device is online while its last report is no older than `expiry`
pub fn is_online(observed_at: DateTime<Utc>, now: DateTime<Utc>, expiry: Duration) -> bool {
    now.signed_duration_since(observed_at) <= expiry
}

/// List of device views, as served by the snapshot endpoint and the live stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    pub devices: Vec<DeviceStateView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryView {
    pub ts: f64,
    pub temp: f64,
    pub vote: Vote,
    pub vote_tag: VoteTag,
}

impl From<&HistoryEntry> for HistoryEntryView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            ts: epoch_seconds(entry.observed_at),
            temp: entry.temperature_c,
            vote: entry.vote,
            vote_tag: entry.vote.tag(),
        }
    }
}

/// Response body of the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub device: DeviceId,
    pub history: Vec<HistoryEntryView>,
}

impl HistoryView {
    pub fn new(device: impl Into<DeviceId>, entries: &[HistoryEntry]) -> Self {
        Self {
            device: device.into(),
            history: entries.iter().map(HistoryEntryView::from).collect(),
        }
    }
}
