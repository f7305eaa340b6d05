//! Session context
//!
//! Identity of one accepted connection, carried through its handler for
//! logging.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Which endpoint a connection arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Bus pushing positions
    Ingest,
    /// Browser subscribing to a viewport
    Browse,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Ingest => f.write_str("ingest"),
            Role::Browse => f.write_str("browse"),
        }
    }
}

/// Per-connection identity
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID, shared counter across both endpoints
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Endpoint the session belongs to
    pub role: Role,

    /// When the connection was accepted
    pub connected_at: Instant,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: SocketAddr, role: Role) -> Self {
        Self {
            session_id,
            peer_addr,
            role,
            connected_at: Instant::now(),
        }
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
