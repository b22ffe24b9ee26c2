//! Shared response cache for provider gateways.
//!
//! Entries are keyed `"{provider}:{suffix}"` so one provider's entries can be
//! counted or cleared without touching the others. Expiry is lazy: a stale
//! entry is removed by the lookup that finds it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::clock::Clock;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.inserted_at + self.ttl
    }
}

/// Lookup counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Look up a live entry. Expired entries are removed and count as misses.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();

        let found = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            None => None,
        };

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: self.clock.now(),
                ttl,
            },
        );
    }

    /// Remove every entry belonging to one provider. Returns how many were removed.
    pub fn clear_prefix(&self, provider: &str) -> usize {
        let prefix = format!("{provider}:");
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Entries held for one provider, expired or not.
    pub fn len_with_prefix(&self, provider: &str) -> usize {
        let prefix = format!("{provider}:");
        self.entries.iter().filter(|entry| entry.key().starts_with(&prefix)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache() -> (Arc<ManualClock>, ResponseCache) {
        let clock = Arc::new(ManualClock::new());
        (clock.clone(), ResponseCache::new(clock))
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = cache();
        cache.set("analytics:x", json!({"users": 1}), Duration::from_millis(100));
        assert_eq!(cache.get("analytics:x"), Some(json!({"users": 1})));

        clock.advance(Duration::from_millis(150));
        assert_eq!(cache.get("analytics:x"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_alive_at_exact_ttl() {
        let (clock, cache) = cache();
        cache.set("k:1", json!(1), Duration::from_millis(100));
        clock.advance(Duration::from_millis(100));
        assert_eq!(cache.get("k:1"), Some(json!(1)));
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let (_, cache) = cache();
        cache.set("k:1", json!(true), Duration::from_secs(60));
        cache.get("k:1");
        cache.get("k:1");
        cache.get("k:2");

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_clear_prefix_only_touches_one_provider() {
        let (_, cache) = cache();
        cache.set("analytics:a", json!(1), Duration::from_secs(60));
        cache.set("analytics:b", json!(2), Duration::from_secs(60));
        cache.set("search-console:a", json!(3), Duration::from_secs(60));

        assert_eq!(cache.len_with_prefix("analytics"), 2);
        assert_eq!(cache.clear_prefix("analytics"), 2);
        assert_eq!(cache.len_with_prefix("analytics"), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear(), 1);
    }
}
