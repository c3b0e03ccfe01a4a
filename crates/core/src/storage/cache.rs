use crate::time::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at_millis: i64,
}

/// In-process key/value cache with per-entry expiry.
///
/// Expired entries are evicted lazily by the read that finds them. There is no
/// size bound; distinct keys accumulate until they expire and are read again.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        // remove_if holds the shard lock, so a concurrent fresh `set` is never dropped.
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at_millis <= now)
            .is_some()
        {
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or overwrite `key`. A zero TTL stores nothing.
    pub fn set(&self, key: &str, value: V, ttl_secs: u64) {
        if ttl_secs == 0 {
            self.entries.remove(key);
            return;
        }
        let ttl_millis = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at_millis = self.clock.now_millis().saturating_add(ttl_millis);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at_millis,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
