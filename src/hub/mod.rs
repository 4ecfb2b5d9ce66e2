//! Live fan-out of accepted readings

pub mod broadcast;

pub use broadcast::{BroadcastHub, EventKind, HubEvent, Subscriber, SubscriberId};
