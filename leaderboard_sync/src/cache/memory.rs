//! Process-local [`CacheStore`] on a concurrent map.
//!
//! Expiry uses the tokio clock, so tests can pause and advance time. Expired
//! entries are evicted lazily on read, and every [`DEFAULT_SWEEP_EVERY`]th
//! write sweeps the whole map through [`MemoryCache::purge_expired`], so keys
//! that are never read again do not accumulate. No shard lock is held across
//! an `.await`.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheResult, CacheStats, CacheStore, deadline};

/// Writes between two full sweeps of expired entries.
pub const DEFAULT_SWEEP_EVERY: u64 = 1024;

#[derive(Debug)]
struct CachedValue {
    value: Value,
    expires_at: Instant,
}

/// In-memory cache shared by reference (`Arc<MemoryCache>`).
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, CachedValue>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    writes: AtomicU64,
    sweep_every: u64,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep_every(DEFAULT_SWEEP_EVERY)
    }
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache that sweeps expired entries every `writes` sets.
    pub fn with_sweep_every(writes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            sweep_every: writes.max(1),
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Current usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let now = Instant::now();
        // The shard guard is released at the end of `map`.
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Some(None) => {
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.expires_at <= now)
                    .is_some()
                {
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }
        let expires_at = deadline(ttl);
        self.entries
            .insert(key.to_string(), CachedValue { value, expires_at });

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.sweep_every == 0 {
            let purged = self.purge_expired();
            let stats = self.stats();
            debug!(
                purged,
                entries = stats.entry_count,
                hit_rate = stats.hit_rate(),
                "swept expired cache entries"
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", json!({"a": 1}), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!({"a": 1})));

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_are_never_served_past_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::from_secs(300)).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty(), "expired entry is evicted on read");
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let cache = MemoryCache::new();
        cache.set("short", json!(1), Duration::from_secs(10)).await.unwrap();
        cache.set("long", json!(2), Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_entries_that_are_never_read_again() {
        let cache = MemoryCache::with_sweep_every(4);
        for key in ["a", "b", "c"] {
            cache.set(key, json!(1), Duration::from_secs(10)).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        // Fourth write triggers the sweep.
        cache.set("d", json!(2), Duration::from_secs(10)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_is_clamped_instead_of_overflowing() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::MAX).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));

        tokio::time::advance(crate::cache::MAX_TTL).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_stores_nothing() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::ZERO).await.unwrap();
        assert!(cache.is_empty());
    }
}
