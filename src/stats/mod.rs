//! Relay statistics

pub mod metrics;

pub use metrics::{ActiveSession, RelayStats, StatsSnapshot};
