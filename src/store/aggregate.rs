//! Windowed vote tally, one vote per device

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::device_store::{DeviceRecord, DeviceStore};
use crate::protocol::{epoch_seconds, DeviceId, Vote, VoteTag};

/// Upper bound on the effective window (ten years)
pub const MAX_WINDOW_SECS: i64 = 10 * 365 * 24 * 3600;

/// Vote counts per tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTotals {
    pub warm: usize,
    pub comfortable: usize,
    pub cold: usize,
}

impl VoteTotals {
    fn add(&mut self, tag: VoteTag) {
        match tag {
            VoteTag::Warm => self.warm += 1,
            VoteTag::Comfortable => self.comfortable += 1,
            VoteTag::Cold => self.cold += 1,
        }
    }
}

/// Response body of the vote statistics endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteStats {
    /// Window as requested
    pub window: i64,
    pub now: f64,
    pub total: VoteTotals,
    pub per_device: BTreeMap<DeviceId, VoteTag>,
    pub device_count: usize,
}

/// Tally the most recent vote of every device seen within `window_secs` of `now`
///
/// The effective window is at least one second.
pub fn vote_stats(store: &DeviceStore, window_secs: i64, now: DateTime<Utc>) -> VoteStats {
    let since = now - Duration::seconds(window_secs.clamp(1, MAX_WINDOW_SECS));

    let mut total = VoteTotals::default();
    let mut per_device = BTreeMap::new();

    for record in store.records() {
        if let Some(vote) = counted_vote(record, since) {
            let tag = vote.tag();
            total.add(tag);
            per_device.insert(record.latest().device.clone(), tag);
        }
    }

    VoteStats {
        window: window_secs,
        now: epoch_seconds(now),
        total,
        device_count: per_device.len(),
        per_device,
    }
}

/// The single vote a device contributes to a window starting at `since`
fn counted_vote(record: &DeviceRecord, since: DateTime<Utc>) -> Option<Vote> {
    // History is time-ordered, so only the newest entry can be the first in window
    if let Some(entry) = record.history().back() {
        if entry.observed_at >= since {
            return Some(entry.vote);
        }
    }

    // History may have been truncated; fall back to the latest state
    let latest = record.latest();
    (latest.observed_at >= since).then_some(latest.vote)
}
