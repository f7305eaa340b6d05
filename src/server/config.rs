//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::positions::StoreConfig;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address buses connect to
    pub ingest_addr: SocketAddr,

    /// Address browsers connect to
    pub browse_addr: SocketAddr,

    /// Only accept browse handshakes on this request path (None = any path)
    pub browse_path: Option<String>,

    /// How often each browser receives its visible buses
    pub publish_interval: Duration,

    /// Maximum concurrent connections per endpoint (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// How often relay statistics are logged
    pub stats_interval: Duration,

    /// Position store settings
    pub store: StoreConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ingest_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            browse_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            browse_path: None,
            publish_interval: Duration::from_secs(1),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            stats_interval: Duration::from_secs(30),
            store: StoreConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Set the ingest address
    pub fn ingest_addr(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the browse address
    pub fn browse_addr(mut self, addr: SocketAddr) -> Self {
        self.browse_addr = addr;
        self
    }

    /// Restrict browse handshakes to one path, e.g. `/ws`
    pub fn browse_path(mut self, path: impl Into<String>) -> Self {
        self.browse_path = Some(path.into());
        self
    }

    /// Set the publish interval
    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    /// Set maximum connections per endpoint
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the statistics log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the position store configuration
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Check that every periodic task has a non-zero period
    pub fn validate(&self) -> Result<()> {
        if self.publish_interval.is_zero() {
            return Err(Error::Config("publish_interval must be non-zero".into()));
        }
        if self.stats_interval.is_zero() {
            return Err(Error::Config("stats_interval must be non-zero".into()));
        }
        if self.store.sweep_interval.is_zero() {
            return Err(Error::Config("sweep_interval must be non-zero".into()));
        }
        Ok(())
    }
}
