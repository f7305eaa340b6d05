//! Position store implementation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::config::{RetentionPolicy, StoreConfig};
use super::position::Position;

struct StoredPosition {
    position: Position,
    updated_at: Instant,
}

/// Latest-value map from bus id to position
///
/// Thread-safe via `RwLock`. Browse sessions snapshot far more often than
/// any single bus updates, so reads proceed concurrently. No lock is held
/// across anything but its own acquisition.
pub struct PositionStore {
    entries: RwLock<HashMap<String, StoredPosition>>,
    config: StoreConfig,
}

impl PositionStore {
    /// Create a store that never evicts
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with custom configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Insert a position, replacing any previous one for the same bus
    pub async fn upsert(&self, position: Position) {
        let mut entries = self.entries.write().await;
        let bus_id = position.bus_id.clone();

        let previous = entries.insert(
            bus_id,
            StoredPosition {
                position,
                updated_at: Instant::now(),
            },
        );

        if previous.is_none() {
            tracing::debug!(buses = entries.len(), "New bus tracked");
        }
    }

    /// Point-in-time copy of every known position, ordered by bus id
    ///
    /// The returned vector is detached from the store; later upserts do not
    /// affect it.
    pub async fn snapshot(&self) -> Vec<Position> {
        let entries = self.entries.read().await;
        let mut positions: Vec<Position> = entries.values().map(|e| e.position.clone()).collect();
        drop(entries);

        positions.sort_by(|a, b| a.bus_id.cmp(&b.bus_id));
        positions
    }

    /// Number of tracked buses
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no bus has reported yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run the retention sweep once
    ///
    /// Returns the number of evicted entries. A no-op under
    /// [`RetentionPolicy::Forever`].
    pub async fn sweep(&self) -> usize {
        let RetentionPolicy::ExpireAfter(max_age) = self.config.retention else {
            return 0;
        };

        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|bus_id, entry| {
            let keep = now.duration_since(entry.updated_at) <= max_age;
            if !keep {
                tracing::debug!(bus_id = %bus_id, "Stale bus evicted");
            }
            keep
        });

        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::info!(evicted = evicted, remaining = entries.len(), "Retention sweep");
        }
        evicted
    }

    /// Spawn the background retention sweep
    ///
    /// Returns `None` when the policy never evicts; otherwise a handle that
    /// can be used to abort the task.
    pub fn spawn_retention_task(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self.config.retention == RetentionPolicy::Forever {
            return None;
        }

        let store = Arc::clone(self);
        let interval = store.config.sweep_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        }))
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_upsert_then_snapshot() {
        let store = PositionStore::new();
        let position = Position::new("156-0", 55.751244, 37.618423, "156");

        store.upsert(position.clone()).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot, vec![position]);
    }

    #[tokio::test]
    async fn test_latest_write_wins() {
        let store = PositionStore::new();

        store.upsert(Position::new("a", 55.0, 37.0, "1")).await;
        store.upsert(Position::new("a", 56.0, 38.0, "1")).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].lat, 56.0);
        assert_eq!(snapshot[0].lng, 38.0);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = PositionStore::new();
        store.upsert(Position::new("a", 55.0, 37.0, "1")).await;

        let snapshot = store.snapshot().await;
        store.upsert(Position::new("a", 10.0, 10.0, "1")).await;
        store.upsert(Position::new("b", 11.0, 11.0, "2")).await;

        assert_eq!(snapshot, vec![Position::new("a", 55.0, 37.0, "1")]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_bus_id() {
        let store = PositionStore::new();
        for id in ["c", "a", "b"] {
            store.upsert(Position::new(id, 1.0, 1.0, "r")).await;
        }

        let ids: Vec<String> = store.snapshot().await.into_iter().map(|p| p.bus_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forever_never_evicts() {
        let store = PositionStore::new();
        store.upsert(Position::new("a", 1.0, 1.0, "r")).await;

        tokio::time::advance(Duration::from_secs(24 * 3600)).await;

        assert_eq!(store.sweep().await, 0);
        assert_eq!(store.len().await, 1);
        assert!(Arc::new(PositionStore::new()).spawn_retention_task().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_after_evicts_only_stale() {
        let config = StoreConfig::default().expire_after(Duration::from_secs(30));
        let store = PositionStore::with_config(config);

        store.upsert(Position::new("stale", 1.0, 1.0, "r")).await;
        tokio::time::advance(Duration::from_secs(20)).await;
        store.upsert(Position::new("fresh", 2.0, 2.0, "r")).await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(store.sweep().await, 1);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].bus_id, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_task_sweeps() {
        let config = StoreConfig::default()
            .expire_after(Duration::from_secs(5))
            .sweep_interval(Duration::from_secs(1));
        let store = Arc::new(PositionStore::with_config(config));
        store.upsert(Position::new("a", 1.0, 1.0, "r")).await;

        let handle = store.spawn_retention_task().unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;

        assert!(store.is_empty().await);
        handle.abort();
    }
}
