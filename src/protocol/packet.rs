//! Text packet codec
//!
//! Devices send one datagram per reading:
//!
//! ```text
//! <device>:temp:<float>:vote:<int>[:<key>:<value>...]
//! ```
//!
//! Everything after the temperature is read as key/value pairs. Only `vote`
//! is understood; other pairs are skipped.

use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::num::IntErrorKind;

use super::reading::{DeviceId, Reading, Vote};
use crate::error::ParseError;

/// Field separator
pub const SEPARATOR: char = ':';

/// Literal expected in field 1
pub const TEMP_TOKEN: &str = "temp";

/// Key carrying the comfort vote
pub const VOTE_KEY: &str = "vote";

/// device, `temp`, value, `vote`, value
const MIN_FIELDS: usize = 5;

/// Decoded packet, before it is stamped with arrival time and source
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub device: DeviceId,
    pub temperature_c: f64,
    pub vote: Vote,
}

impl Packet {
    /// Decode a raw datagram
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| ParseError::InvalidUtf8)?
            .trim();

        let fields: Vec<&str> = text.split(SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields(fields.len()));
        }

        let device = fields[0];
        if device.is_empty() {
            return Err(ParseError::EmptyDevice);
        }

        if fields[1] != TEMP_TOKEN {
            return Err(ParseError::UnexpectedToken(fields[1].to_string()));
        }

        let temperature_c = parse_temperature(fields[2])?;

        // First `vote` key wins, even if its value turns out to be bad
        let vote = fields[3..]
            .chunks_exact(2)
            .find(|pair| pair[0] == VOTE_KEY)
            .ok_or(ParseError::MissingVote)
            .and_then(|pair| parse_vote(pair[1]))?;

        Ok(Self {
            device: device.to_string(),
            temperature_c,
            vote,
        })
    }

    /// Canonical wire form
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.device,
            TEMP_TOKEN,
            self.temperature_c,
            VOTE_KEY,
            self.vote.value(),
            sep = SEPARATOR
        )
    }

    /// Stamp the packet with its arrival context
    pub fn into_reading(self, source: SocketAddr, observed_at: DateTime<Utc>) -> Reading {
        Reading {
            device: self.device,
            temperature_c: self.temperature_c,
            vote: self.vote,
            observed_at,
            source,
        }
    }
}

/// Decode a datagram straight into a [`Reading`]
pub fn parse_reading(
    raw: &[u8],
    source: SocketAddr,
    observed_at: DateTime<Utc>,
) -> Result<Reading, ParseError> {
    Packet::parse(raw).map(|packet| packet.into_reading(source, observed_at))
}

fn parse_temperature(field: &str) -> Result<f64, ParseError> {
    let value: f64 = field
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidTemperature(field.to_string()))?;

    // NaN and infinities have no JSON representation
    if !value.is_finite() {
        return Err(ParseError::InvalidTemperature(field.to_string()));
    }

    Ok(value)
}

fn parse_vote(field: &str) -> Result<Vote, ParseError> {
    match field.trim().parse::<i64>() {
        Ok(value) => Ok(Vote::from_clamped(value)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(Vote::Warm),
            IntErrorKind::NegOverflow => Ok(Vote::Cold),
            _ => Err(ParseError::InvalidVote(field.to_string())),
        },
    }
}
