//! Load generator configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the simulated bus fleet
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Relay ingest endpoint
    pub server_url: String,

    /// Number of outbound connections (one lane each)
    pub websockets_number: usize,

    /// Capacity of each lane's queue
    pub channel_capacity: usize,

    /// Buses simulated on every route
    pub buses_per_route: usize,

    /// Maximum number of routes to simulate (None = all loaded)
    pub routes_number: Option<usize>,

    /// Prefix for generated bus ids
    pub emulator_id: String,

    /// Pause between two positions of one bus
    pub refresh_timeout: Duration,

    /// Waypoints advanced per update
    pub step: usize,

    /// Restart from the first waypoint after the last one
    pub looped: bool,

    /// Upper bound of the random delay before a bus starts
    pub start_jitter: Duration,

    /// Pause before reconnecting a failed lane
    pub reconnect_delay: Duration,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_owned(),
            websockets_number: 5,
            channel_capacity: 100,
            buses_per_route: 1,
            routes_number: None,
            emulator_id: String::new(),
            refresh_timeout: Duration::from_secs(1),
            step: 1,
            looped: true,
            start_jitter: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl EmulatorConfig {
    /// Create a new config targeting the given relay
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Set the number of outbound connections
    pub fn websockets_number(mut self, count: usize) -> Self {
        self.websockets_number = count;
        self
    }

    /// Set the per-lane queue capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the number of buses per route
    pub fn buses_per_route(mut self, count: usize) -> Self {
        self.buses_per_route = count;
        self
    }

    /// Limit the number of simulated routes
    pub fn routes_number(mut self, count: usize) -> Self {
        self.routes_number = Some(count);
        self
    }

    /// Set the bus id prefix
    pub fn emulator_id(mut self, id: impl Into<String>) -> Self {
        self.emulator_id = id.into();
        self
    }

    /// Set the pause between updates
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Set the waypoint step
    pub fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Stop each bus at the end of its route
    pub fn no_loop(mut self) -> Self {
        self.looped = false;
        self
    }

    /// Set the maximum start jitter
    pub fn start_jitter(mut self, jitter: Duration) -> Self {
        self.start_jitter = jitter;
        self
    }

    /// Set the reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Reject values that would leave the fleet unable to run
    pub fn validate(&self) -> Result<()> {
        if self.websockets_number == 0 {
            return Err(Error::Config("websockets_number must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".into()));
        }
        if self.buses_per_route == 0 {
            return Err(Error::Config("buses_per_route must be at least 1".into()));
        }
        if self.step == 0 {
            return Err(Error::Config("step must be at least 1".into()));
        }
        Ok(())
    }

    /// Bus id for bus `index` on `route`
    pub fn bus_id(&self, route: &str, index: usize) -> String {
        format!("{}{}-{}", self.emulator_id, route, index)
    }
}
