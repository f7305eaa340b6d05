//! Statistics for relay sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::session::Role;

/// Relay-wide counters shared by every session
///
/// All counters are relaxed atomics; they feed periodic log lines, not
/// control decisions.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_ingest: AtomicU64,
    active_browse: AtomicU64,
    updates_accepted: AtomicU64,
    updates_rejected: AtomicU64,
    snapshots_sent: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_ingest: AtomicU64::new(0),
            active_browse: AtomicU64::new(0),
            updates_accepted: AtomicU64::new(0),
            updates_rejected: AtomicU64::new(0),
            snapshots_sent: AtomicU64::new(0),
        }
    }

    /// Count a live session until the returned guard is dropped
    pub fn session_opened(&self, role: Role) -> ActiveSession<'_> {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active(role).fetch_add(1, Ordering::Relaxed);
        ActiveSession { stats: self, role }
    }

    pub fn record_accepted(&self) {
        self.updates_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_ingest: self.active_ingest.load(Ordering::Relaxed),
            active_browse: self.active_browse.load(Ordering::Relaxed),
            updates_accepted: self.updates_accepted.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
            snapshots_sent: self.snapshots_sent.load(Ordering::Relaxed),
        }
    }

    fn active(&self, role: Role) -> &AtomicU64 {
        match role {
            Role::Ingest => &self.active_ingest,
            Role::Browse => &self.active_browse,
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the active count for its role on drop
///
/// Dropping covers every way a session ends, including cancellation.
#[derive(Debug)]
pub struct ActiveSession<'a> {
    stats: &'a RelayStats,
    role: Role,
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.stats.active(self.role).fetch_sub(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the relay counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stats were created
    pub uptime: Duration,
    /// Connections accepted on either endpoint
    pub total_connections: u64,
    /// Currently connected buses
    pub active_ingest: u64,
    /// Currently connected browsers
    pub active_browse: u64,
    /// Ingest frames applied to the store
    pub updates_accepted: u64,
    /// Ingest frames dropped as malformed
    pub updates_rejected: u64,
    /// `Buses` messages sent to browsers
    pub snapshots_sent: u64,
}
