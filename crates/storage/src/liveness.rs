//! In-process cache of transceiver liveness.
//!
//! Maps a transceiver id to the last time its gateway was heard. Entries
//! expire after a short TTL so liveness is re-read from the store
//! periodically; the liveness decision itself compares the cached timestamp
//! against a much longer window.
//!
//! Misses are resolved outside the lock, so concurrent misses for the same
//! id may each query the store. The last insert wins.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use coverage_common::{CoverageError, CoverageResult, LastHeardSource};
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Liveness cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// A transceiver heard within this window is live.
    pub window: chrono::Duration,
    /// How long a cached timestamp is trusted.
    pub ttl: Duration,
    /// How often expired entries are purged.
    pub cleanup_interval: Duration,
    /// Maximum number of cached transceivers.
    pub capacity: usize,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            window: chrono::Duration::days(5),
            ttl: Duration::from_secs(5 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
            capacity: 100_000,
        }
    }
}

struct LastHeardEntry {
    last_heard: Option<DateTime<Utc>>,
    inserted_at: Instant,
}

impl LastHeardEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Counters for the liveness cache.
#[derive(Debug, Default)]
pub struct LivenessCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired: AtomicU64,
    /// Store lookups that failed.
    pub failures: AtomicU64,
}

impl LivenessCacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// TTL-bounded LRU of transceiver last-heard timestamps.
pub struct LivenessCache {
    source: Arc<dyn LastHeardSource>,
    cache: RwLock<LruCache<i64, LastHeardEntry>>,
    config: LivenessConfig,
    stats: LivenessCacheStats,
}

impl LivenessCache {
    pub fn new(source: Arc<dyn LastHeardSource>, config: LivenessConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            cache: RwLock::new(LruCache::new(capacity)),
            config,
            stats: LivenessCacheStats::default(),
        }
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn stats(&self) -> &LivenessCacheStats {
        &self.stats
    }

    /// Whether the transceiver was heard within the liveness window.
    ///
    /// A transceiver the store has never heard is not live. A failed store
    /// lookup is returned as [`CoverageError::LivenessUnavailable`] and
    /// nothing is cached.
    pub async fn is_live(&self, antenna_id: i64) -> CoverageResult<bool> {
        let now = Utc::now();

        if let Some(last_heard) = self.cached(antenna_id).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(self.is_recent(last_heard, now));
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let last_heard = self
            .source
            .antenna_last_heard(antenna_id)
            .await
            .map_err(|e| {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(antenna_id, error = %e, "Liveness lookup failed");
                CoverageError::LivenessUnavailable {
                    antenna_id,
                    message: e.to_string(),
                }
            })?;

        self.insert(antenna_id, last_heard).await;
        debug!(antenna_id, last_heard = ?last_heard, "Liveness loaded from store");

        Ok(self.is_recent(last_heard, now))
    }

    /// Number of cached transceivers, expired ones included.
    pub async fn entry_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let mut cache = self.cache.write().await;

        let expired: Vec<i64> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            cache.pop(id);
        }

        self.stats
            .expired
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        publish_size(cache.len());
        expired.len()
    }

    async fn cached(&self, antenna_id: i64) -> Option<Option<DateTime<Utc>>> {
        let mut cache = self.cache.write().await;
        let (last_heard, expired) = {
            let entry = cache.get(&antenna_id)?;
            (entry.last_heard, entry.is_expired(self.config.ttl))
        };

        if expired {
            cache.pop(&antenna_id);
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            publish_size(cache.len());
            return None;
        }
        Some(last_heard)
    }

    async fn insert(&self, antenna_id: i64, last_heard: Option<DateTime<Utc>>) {
        let mut cache = self.cache.write().await;
        cache.put(
            antenna_id,
            LastHeardEntry {
                last_heard,
                inserted_at: Instant::now(),
            },
        );
        publish_size(cache.len());
    }

    fn is_recent(&self, last_heard: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_heard {
            Some(t) => t >= now - self.config.window,
            None => false,
        }
    }
}

fn publish_size(len: usize) {
    metrics::gauge!("tms_antenna_cache_size").set(len as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FixedSource {
        last_heard: Option<DateTime<Utc>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LastHeardSource for FixedSource {
        async fn antenna_last_heard(&self, _antenna_id: i64) -> CoverageResult<Option<DateTime<Utc>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.last_heard)
        }
    }

    fn cache_with(last_heard: Option<DateTime<Utc>>, ttl: Duration) -> (Arc<FixedSource>, LivenessCache) {
        let source = Arc::new(FixedSource {
            last_heard,
            calls: AtomicUsize::new(0),
        });
        let config = LivenessConfig {
            ttl,
            ..LivenessConfig::default()
        };
        (source.clone(), LivenessCache::new(source, config))
    }

    #[tokio::test]
    async fn test_recent_is_live_and_cached() {
        let (source, cache) = cache_with(Some(Utc::now() - chrono::Duration::hours(1)), Duration::from_secs(60));

        assert!(cache.is_live(7).await.unwrap());
        assert!(cache.is_live(7).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_old_and_unknown_are_not_live() {
        let (_, cache) = cache_with(Some(Utc::now() - chrono::Duration::days(6)), Duration::from_secs(60));
        assert!(!cache.is_live(1).await.unwrap());

        let (_, cache) = cache_with(None, Duration::from_secs(60));
        assert!(!cache.is_live(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_reloaded_and_purged() {
        let (source, cache) = cache_with(Some(Utc::now()), Duration::ZERO);

        assert!(cache.is_live(3).await.unwrap());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.is_live(3).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.entry_count().await, 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = LivenessCacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.hits.store(3, Ordering::Relaxed);
        stats.misses.store(1, Ordering::Relaxed);
        assert_eq!(stats.hit_rate(), 75.0);
    }
}
