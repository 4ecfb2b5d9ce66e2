//! Accepted device readings and comfort votes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Opaque per-device identifier (hex of the board's hardware id)
pub type DeviceId = String;

/// Comfort vote reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Vote {
    Cold,
    Comfortable,
    Warm,
}

impl Vote {
    /// Clamp an arbitrary integer into the vote range
    pub fn from_clamped(value: i64) -> Self {
        match value.signum() {
            1 => Vote::Warm,
            -1 => Vote::Cold,
            _ => Vote::Comfortable,
        }
    }

    /// Wire value in {-1, 0, 1}
    pub fn value(self) -> i8 {
        match self {
            Vote::Cold => -1,
            Vote::Comfortable => 0,
            Vote::Warm => 1,
        }
    }

    pub fn tag(self) -> VoteTag {
        match self {
            Vote::Cold => VoteTag::Cold,
            Vote::Comfortable => VoteTag::Comfortable,
            Vote::Warm => VoteTag::Warm,
        }
    }
}

impl From<Vote> for i8 {
    fn from(vote: Vote) -> Self {
        vote.value()
    }
}

impl TryFrom<i8> for Vote {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Vote::Cold),
            0 => Ok(Vote::Comfortable),
            1 => Ok(Vote::Warm),
            other => Err(format!("vote out of range: {}", other)),
        }
    }
}

/// Human-facing label for a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTag {
    Warm,
    Comfortable,
    Cold,
}

impl VoteTag {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteTag::Warm => "warm",
            VoteTag::Comfortable => "comfortable",
            VoteTag::Cold => "cold",
        }
    }
}

impl fmt::Display for VoteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted device report
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device: DeviceId,
    pub temperature_c: f64,
    pub vote: Vote,
    pub observed_at: DateTime<Utc>,
    /// Address the datagram arrived from
    pub source: SocketAddr,
}

impl Reading {
    pub fn epoch_seconds(&self) -> f64 {
        epoch_seconds(self.observed_at)
    }
}

/// Unix time in fractional seconds, as exposed over the API
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Payload of a live `reading` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEvent {
    pub device: DeviceId,
    pub temp: f64,
    pub vote: Vote,
    pub vote_tag: VoteTag,
    pub ts: f64,
}

impl From<&Reading> for ReadingEvent {
    fn from(reading: &Reading) -> Self {
        Self {
            device: reading.device.clone(),
            temp: reading.temperature_c,
            vote: reading.vote,
            vote_tag: reading.vote.tag(),
            ts: reading.epoch_seconds(),
        }
    }
}
