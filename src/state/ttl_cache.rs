use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Stale once strictly more than `ttl` has passed since the write.
    fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) > self.ttl
    }
}

// ---------------------------------------------------------------------------
// TtlCache
// ---------------------------------------------------------------------------

/// Key → value store with per-entry expiry checked on read.
///
/// Stale entries are evicted lazily by the read that finds them. Reads and
/// writes are not coordinated: two concurrent misses may both compute and both
/// write, last write wins.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let stale = {
            let entry = self.entries.get(key)?;
            if !entry.is_stale(now) {
                return Some(entry.value.clone());
            }
            entry.written_at
        };
        // Only evict the entry we judged stale; a concurrent set may have
        // replaced it in between.
        self.entries.remove_if(key, |_, e| e.written_at == stale);
        None
    }

    pub fn set_at(&self, key: K, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: now,
                ttl,
            },
        );
    }

    /// Number of stored entries, stale ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_when_never_set() {
        let cache: Arc<TtlCache<String, u32>> = TtlCache::new();
        assert!(cache.get(&"latest".to_string()).is_none());
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = TtlCache::new();
        let t0 = Instant::now();
        cache.set_at("latest", 1180u32, Duration::from_secs(60), t0);
        assert_eq!(cache.get_at(&"latest", t0 + Duration::from_secs(30)), Some(1180));
        // Exactly at the TTL boundary is still fresh.
        assert_eq!(cache.get_at(&"latest", t0 + Duration::from_secs(60)), Some(1180));
    }

    #[test]
    fn stale_entry_is_evicted_on_read() {
        let cache = TtlCache::new();
        let t0 = Instant::now();
        cache.set_at("latest", 1180u32, Duration::from_secs(60), t0);
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at(&"latest", t0 + Duration::from_secs(61)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_resets_expiry() {
        let cache = TtlCache::new();
        let t0 = Instant::now();
        cache.set_at("latest", 1179u32, Duration::from_secs(60), t0);
        let t1 = t0 + Duration::from_secs(50);
        cache.set_at("latest", 1180u32, Duration::from_secs(60), t1);
        assert_eq!(cache.get_at(&"latest", t0 + Duration::from_secs(100)), Some(1180));
    }
}
