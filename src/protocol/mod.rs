//! Wire protocol: device packets and the readings they decode into

pub mod packet;
pub mod reading;

pub use packet::{parse_reading, Packet};
pub use reading::{epoch_seconds, DeviceId, Reading, ReadingEvent, Vote, VoteTag};
