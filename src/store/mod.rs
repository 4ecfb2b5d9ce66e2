//! In-memory device state, bounded history and vote aggregation

pub mod aggregate;
pub mod device_store;
pub mod view;

pub use aggregate::{vote_stats, VoteStats, VoteTotals};
pub use device_store::{DeviceRecord, DeviceState, DeviceStore, HistoryEntry};
pub use view::{DeviceList, DeviceStateView, HistoryEntryView, HistoryView};
