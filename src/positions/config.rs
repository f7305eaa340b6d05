//! Position store configuration

use std::time::Duration;

/// How long entries stay in the store without being refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Never evict; a silent bus stays visible at its last position
    #[default]
    Forever,
    /// Evict entries whose last update is older than the given age
    ExpireAfter(Duration),
}

/// Configuration for the position store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Eviction policy for stale entries
    pub retention: RetentionPolicy,

    /// How often the retention sweep runs (ignored with `Forever`)
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::Forever,
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    /// Evict entries not updated within `max_age`
    pub fn expire_after(mut self, max_age: Duration) -> Self {
        self.retention = RetentionPolicy::ExpireAfter(max_age);
        self
    }

    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keeps_everything() {
        let config = StoreConfig::default();
        assert_eq!(config.retention, RetentionPolicy::Forever);
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::default()
            .expire_after(Duration::from_secs(60))
            .sweep_interval(Duration::from_secs(5));

        assert_eq!(
            config.retention,
            RetentionPolicy::ExpireAfter(Duration::from_secs(60))
        );
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
    }
}
