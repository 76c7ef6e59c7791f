//! Time-bounded key/value cache in front of the store.
//!
//! [`CacheStore`] is a plain JSON key/value interface with per-entry TTLs so it
//! can be backed by anything from a process-local map ([`memory::MemoryCache`])
//! to an external service. Keys are built in [`keys`] and always start with
//! a kind prefix followed by the tenant id.
//!
//! Callers treat every cache error as a miss; the cache is an accelerator,
//! never a source of truth.

pub mod keys;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

pub use memory::MemoryCache;

/// Default lifetime of a cached leaderboard page.
pub const DEFAULT_DATA_TTL: Duration = Duration::from_secs(300);
/// Default lifetime of a cached leaderboard configuration.
pub const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(300);
/// Default lifetime of a cached tenant lookup.
pub const DEFAULT_TENANT_TTL: Duration = Duration::from_secs(3600);
/// Longest lifetime any entry can get; longer TTLs are clamped to this.
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Instant at which an entry written now with `ttl` expires. Never panics.
pub(crate) fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

/// Errors surfaced by a [`CacheStore`] backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the operation.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value cache with per-entry expiry.
///
/// An entry is never returned after its TTL elapses; absence is always valid.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live value under `key`, if any.
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()>;

    /// Removes `key`. Returns `true` if a live entry was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

/// Lifetimes applied to each kind of cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Leaderboard pages.
    pub data: Duration,
    /// Leaderboard configuration.
    pub config: Duration,
    /// Tenant lookups.
    pub tenant: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            data: DEFAULT_DATA_TTL,
            config: DEFAULT_CONFIG_TTL,
            tenant: DEFAULT_TENANT_TTL,
        }
    }
}

/// Usage counters for a cache backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a live value.
    pub hits: u64,
    /// Reads that found nothing or an expired value.
    pub misses: u64,
    /// Entries currently held, including expired ones not yet purged.
    pub entry_count: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
