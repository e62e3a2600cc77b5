//! TTL result cache for trend and correlation results
//!
//! Entries are immutable once written; a write replaces the previous entry
//! for the key. Expired entries are dropped lazily on read and proactively
//! by `run_sweeper`.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info};

/// Default time-to-live for cached analytics results (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Concurrency-safe map of keyed results with per-entry TTL
pub struct ResultCache<V> {
    name: &'static str,
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // A concurrent writer may have replaced the entry since the read above
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Store `value` with the cache's default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// Periodically purge expired entries until shutdown
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        info!(cache = self.name, interval_secs = every.as_secs(), "Starting cache sweeper");
        let mut ticker = interval(every);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        debug!(cache = self.name, removed, remaining = self.len(), "Purged expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    info!(cache = self.name, "Shutting down cache sweeper");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cache = ResultCache::new("test", DEFAULT_CACHE_TTL);
        cache.insert("k", 42);
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_write_replaces_entry() {
        let cache = ResultCache::new("test", DEFAULT_CACHE_TTL);
        cache.insert("k", 1);
        cache.insert("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_evicted() {
        let cache = ResultCache::new("test", DEFAULT_CACHE_TTL);
        cache.set("k", "v".to_string(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_never_served() {
        let cache = ResultCache::new("test", DEFAULT_CACHE_TTL);
        cache.set("k", 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_purge_expired_keeps_live_entries() {
        let cache = ResultCache::new("test", DEFAULT_CACHE_TTL);
        cache.set("short", 1, Duration::from_millis(5));
        cache.insert("long", 2);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_writers_same_key() {
        let cache = Arc::new(ResultCache::new("test", DEFAULT_CACHE_TTL));
        let mut handles = Vec::new();
        for i in 0..16u64 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..100u64 {
                    cache.insert("shared", (i, j));
                    let (a, b) = cache.get("shared").unwrap();
                    assert!(a < 16 && b < 100);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let cache = Arc::new(ResultCache::new("test", DEFAULT_CACHE_TTL));
        cache.set("k", 1, Duration::from_millis(1));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(cache.clone().run_sweeper(Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
