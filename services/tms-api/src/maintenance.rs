//! Background upkeep of the liveness cache.

use std::sync::Arc;
use std::time::Duration;

use storage::LivenessCache;
use tokio::time::interval;
use tracing::{debug, info};

/// Periodically purges expired liveness entries.
pub struct LivenessJanitor {
    cache: Arc<LivenessCache>,
    interval: Duration,
}

impl LivenessJanitor {
    pub fn new(cache: Arc<LivenessCache>) -> Self {
        let interval = cache.config().cleanup_interval;
        Self { cache, interval }
    }

    /// Run a single purge. Returns the number of entries removed.
    pub async fn run_once(&self) -> usize {
        let removed = self.cache.purge_expired().await;
        let remaining = self.cache.entry_count().await;
        debug!(removed, remaining, "Purged expired liveness entries");
        removed
    }

    /// Purge on every tick. Never returns.
    pub async fn run_forever(self) {
        if self.interval.is_zero() {
            info!("Liveness cleanup disabled");
            return;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Starting liveness cleanup task"
        );

        let mut ticker = interval(self.interval);
        // The first tick completes immediately; the cache is empty at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::LivenessConfig;
    use test_utils::{hours_ago, MemoryStore};

    #[tokio::test]
    async fn test_run_once_purges_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        store.add_antenna(1, "net", "gw", Some(hours_ago(1)));
        store.add_antenna(2, "net", "gw", Some(hours_ago(2)));

        let config = LivenessConfig {
            ttl: Duration::from_millis(10),
            ..LivenessConfig::default()
        };
        let cache = Arc::new(LivenessCache::new(store, config));
        assert!(cache.is_live(1).await.unwrap());
        assert!(cache.is_live(2).await.unwrap());

        tokio::time::sleep(Duration::from_millis(30)).await;

        let janitor = LivenessJanitor::new(cache.clone());
        assert_eq!(janitor.run_once().await, 2);
        assert_eq!(cache.entry_count().await, 0);
    }
}
