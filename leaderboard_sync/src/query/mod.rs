//! Cached, paginated leaderboard reads.
//!
//! [`LeaderboardQueryService`] answers page and configuration queries with a
//! read-through pattern: cache first, then the store, then populate the cache.
//! It also owns invalidation. Because a [`CacheStore`] has no pattern delete,
//! the service remembers every page key it populated per `(tenant, casino)`
//! until that key's TTL elapses, and deletes exactly those. Leaderboards that
//! do not exist are never cached, so unknown tenant ids leave nothing behind.
//!
//! Store errors propagate. Cache failures and undecodable cached values are
//! logged and treated as misses.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheError, CacheStore, CacheTtls, deadline, keys},
    ingest::CacheInvalidator,
    models::LeaderboardEntry,
    store::{StoreError, StoreGateway},
};

/// Errors returned by [`LeaderboardQueryService`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Some cache keys could not be deleted during invalidation.
    #[error("cache invalidation incomplete: {0}")]
    Cache(#[from] CacheError),
}

/// One page of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    /// Entries on this page, in rank order.
    pub entries: Vec<LeaderboardEntry>,
    /// Entries across all pages.
    pub total: u64,
    /// 1-based page number that was requested.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// `ceil(total / page_size)`; 0 when there is nothing to show.
    pub total_pages: u64,
}

impl LeaderboardPage {
    /// The page returned when a leaderboard does not exist.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
        }
    }
}

type Scope = (String, String);

/// Tracked keys between two full prunes of [`LeaderboardQueryService::prune_tracked`].
const PRUNE_EVERY: u64 = 256;

/// Read side of the pipeline. Construct once and share with `Arc`.
pub struct LeaderboardQueryService {
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn CacheStore>,
    ttls: CacheTtls,
    /// Populated page keys per scope, with the instant each one expires.
    page_keys: DashMap<Scope, HashMap<String, Instant>>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
    tracked_writes: AtomicU64,
}

impl LeaderboardQueryService {
    /// Creates a service over `store` and `cache`.
    pub fn new(store: Arc<dyn StoreGateway>, cache: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self {
            store,
            cache,
            ttls,
            page_keys: DashMap::new(),
            generation: AtomicU64::new(0),
            tracked_writes: AtomicU64::new(0),
        }
    }

    /// Returns page `page` (1-based) of `page_size` entries for `(tenant_id, casino)`.
    ///
    /// A leaderboard that was never ingested yields an empty page with
    /// `total_pages = 0`. That page is not cached.
    pub async fn get_page(
        &self,
        tenant_id: &str,
        casino: &str,
        page: u32,
        page_size: u32,
    ) -> Result<LeaderboardPage, QueryError> {
        if page < 1 {
            return Err(QueryError::InvalidArgument(format!(
                "page must be >= 1, got {page}"
            )));
        }
        if page_size < 1 {
            return Err(QueryError::InvalidArgument(format!(
                "page size must be >= 1, got {page_size}"
            )));
        }

        let key = keys::page_key(tenant_id, casino, page, page_size);
        if let Some(cached) = self.cached::<LeaderboardPage>(&key).await {
            debug!(%key, "leaderboard page cache hit");
            return Ok(cached);
        }
        debug!(%key, "leaderboard page cache miss");

        let generation = self.generation.load(Ordering::SeqCst);
        if self.store.get_rollup(tenant_id, casino).await?.is_none() {
            warn!(tenant_id, casino, "no leaderboard found");
            return Ok(LeaderboardPage::empty(page, page_size));
        }

        let offset = u64::from(page - 1) * u64::from(page_size);
        let slice = self
            .store
            .list_entries(tenant_id, casino, offset, u64::from(page_size))
            .await?;
        let result = LeaderboardPage {
            entries: slice.entries,
            total: slice.total,
            page,
            page_size,
            total_pages: slice.total.div_ceil(u64::from(page_size)),
        };

        if self.populate(&key, &result, self.ttls.data).await {
            let scope = (tenant_id.to_string(), casino.to_string());
            // Track before re-checking the generation: an invalidation either
            // sees this key or has already bumped the counter.
            self.track(scope.clone(), key.clone(), deadline(self.ttls.data));
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(%key, "invalidated while reading, dropping cached page");
                self.untrack(&scope, &key);
                if let Err(err) = self.cache.delete(&key).await {
                    warn!(%key, error = %err, "failed to drop possibly stale page");
                }
            }
        }
        Ok(result)
    }

    /// Returns the display configuration for `(tenant_id, casino)`, `{}` when
    /// the leaderboard does not exist. Only existing leaderboards are cached.
    pub async fn get_config(&self, tenant_id: &str, casino: &str) -> Result<Value, QueryError> {
        let key = keys::config_key(tenant_id, casino);
        if let Some(cached) = self.cached::<Value>(&key).await {
            return Ok(cached);
        }

        let Some(rollup) = self.store.get_rollup(tenant_id, casino).await? else {
            return Ok(Value::Object(Map::new()));
        };

        self.populate(&key, &rollup.leaderboard_config, self.ttls.config)
            .await;
        Ok(rollup.leaderboard_config)
    }

    /// Drops the cached configuration and every tracked page for
    /// `(tenant_id, casino)`. Returns how many live entries were removed.
    ///
    /// Every key is attempted; keys that failed to delete stay tracked and the
    /// last error is returned. A page read that overlaps this call is not
    /// kept in the cache.
    pub async fn invalidate(&self, tenant_id: &str, casino: &str) -> Result<usize, QueryError> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let scope = (tenant_id.to_string(), casino.to_string());
        let pages = self
            .page_keys
            .remove(&scope)
            .map(|(_, pages)| pages)
            .unwrap_or_default();

        let mut removed = 0;
        let mut failed = HashMap::new();
        let mut last_error = None;

        let config_key = keys::config_key(tenant_id, casino);
        let targets = std::iter::once((config_key, None))
            .chain(pages.into_iter().map(|(key, expires_at)| (key, Some(expires_at))));
        for (key, expires_at) in targets {
            match self.cache.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(%key, error = %err, "failed to delete cache key");
                    if let Some(expires_at) = expires_at {
                        failed.insert(key, expires_at);
                    }
                    last_error = Some(err);
                }
            }
        }

        if !failed.is_empty() {
            self.page_keys.entry(scope).or_default().extend(failed);
        }

        info!(tenant_id, casino, removed, "leaderboard cache invalidated");
        match last_error {
            Some(err) => Err(err.into()),
            None => Ok(removed),
        }
    }

    /// Number of unexpired page keys currently tracked for `(tenant_id, casino)`.
    pub fn tracked_pages(&self, tenant_id: &str, casino: &str) -> usize {
        let now = Instant::now();
        self.page_keys
            .get(&(tenant_id.to_string(), casino.to_string()))
            .map_or(0, |pages| pages.values().filter(|exp| **exp > now).count())
    }

    /// Forgets tracked page keys whose TTL has elapsed and drops empty scopes.
    /// Returns how many keys were forgotten.
    pub fn prune_tracked(&self) -> usize {
        let now = Instant::now();
        let mut pruned = 0;
        self.page_keys.retain(|_, pages| {
            let before = pages.len();
            pages.retain(|_, exp| *exp > now);
            pruned += before - pages.len();
            !pages.is_empty()
        });
        pruned
    }

    fn track(&self, scope: Scope, key: String, expires_at: Instant) {
        let now = Instant::now();
        {
            let mut pages = self.page_keys.entry(scope).or_default();
            pages.retain(|_, exp| *exp > now);
            pages.insert(key, expires_at);
        }
        let tracked = self.tracked_writes.fetch_add(1, Ordering::Relaxed) + 1;
        if tracked % PRUNE_EVERY == 0 {
            let pruned = self.prune_tracked();
            debug!(pruned, scopes = self.page_keys.len(), "pruned expired page keys");
        }
    }

    fn untrack(&self, scope: &Scope, key: &str) {
        if let Some(mut pages) = self.page_keys.get_mut(scope) {
            pages.remove(key);
        }
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    warn!(key, error = %err, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, falling back to store");
                None
            }
        }
    }

    /// Returns `true` when the value was stored.
    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key, error = %err, "could not encode value for cache");
                return false;
            }
        };
        match self.cache.set(key, encoded, ttl).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "cache write failed");
                false
            }
        }
    }
}

#[async_trait]
impl CacheInvalidator for LeaderboardQueryService {
    async fn invalidate(&self, tenant_id: &str, casino: &str) -> Result<usize, QueryError> {
        LeaderboardQueryService::invalidate(self, tenant_id, casino).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheResult, MemoryCache};
    use crate::models::{LeaderboardRollup, Tenant};
    use crate::store::{EntrySlice, StoreResult};
    use chrono::Utc;
    use proptest::prelude::*;
    use tokio::sync::Notify;

    /// Answers with `total` entries and never fails. With `present = false`
    /// no leaderboard exists.
    struct FixedStore {
        total: u64,
        present: bool,
    }

    #[async_trait]
    impl StoreGateway for FixedStore {
        async fn upsert_entries(&self, entries: &[LeaderboardEntry]) -> StoreResult<usize> {
            Ok(entries.len())
        }
        async fn upsert_rollup(&self, _: &str, _: &str, _: &Value, _: Option<&Value>) -> StoreResult<()> {
            Ok(())
        }
        async fn get_rollup(&self, tenant_id: &str, casino: &str) -> StoreResult<Option<LeaderboardRollup>> {
            if !self.present {
                return Ok(None);
            }
            Ok(Some(LeaderboardRollup {
                tenant_id: tenant_id.into(),
                casino: casino.into(),
                last_fetched: Utc::now(),
                data: Value::Array(vec![]),
                leaderboard_config: serde_json::json!({"title": "Weekly"}),
            }))
        }
        async fn list_entries(&self, _: &str, _: &str, offset: u64, limit: u64) -> StoreResult<EntrySlice> {
            let n = self.total.saturating_sub(offset).min(limit);
            let entries = (0..n)
                .map(|i| LeaderboardEntry {
                    tenant_id: "T".into(),
                    casino_player_id: format!("p{}", offset + i),
                    casino: "stake".into(),
                    wager_amount: 1.0,
                    rank: i32::try_from(offset + i + 1).unwrap_or(i32::MAX),
                    timestamp: Utc::now(),
                    data: Default::default(),
                })
                .collect();
            Ok(EntrySlice { entries, total: self.total })
        }
        async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
            Ok(vec![])
        }
        async fn get_tenant(&self, _: &str) -> StoreResult<Option<Tenant>> {
            Ok(None)
        }
        async fn upsert_tenant(&self, _: &Tenant) -> StoreResult<()> {
            Ok(())
        }
    }

    /// A cache that is always down.
    struct DownCache;

    #[async_trait]
    impl CacheStore for DownCache {
        async fn get(&self, _: &str) -> CacheResult<Option<Value>> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn set(&self, _: &str, _: Value, _: Duration) -> CacheResult<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> CacheResult<bool> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    fn service(total: u64, cache: Arc<dyn CacheStore>) -> LeaderboardQueryService {
        let store = FixedStore { total, present: true };
        LeaderboardQueryService::new(Arc::new(store), cache, CacheTtls::default())
    }

    /// Blocks in `list_entries` until released.
    struct GatedStore {
        inner: FixedStore,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl StoreGateway for GatedStore {
        async fn upsert_entries(&self, entries: &[LeaderboardEntry]) -> StoreResult<usize> {
            self.inner.upsert_entries(entries).await
        }
        async fn upsert_rollup(&self, t: &str, c: &str, v: &Value, cfg: Option<&Value>) -> StoreResult<()> {
            self.inner.upsert_rollup(t, c, v, cfg).await
        }
        async fn get_rollup(&self, t: &str, c: &str) -> StoreResult<Option<LeaderboardRollup>> {
            self.inner.get_rollup(t, c).await
        }
        async fn list_entries(&self, t: &str, c: &str, offset: u64, limit: u64) -> StoreResult<EntrySlice> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.list_entries(t, c, offset, limit).await
        }
        async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
            self.inner.list_tenants().await
        }
        async fn get_tenant(&self, id: &str) -> StoreResult<Option<Tenant>> {
            self.inner.get_tenant(id).await
        }
        async fn upsert_tenant(&self, t: &Tenant) -> StoreResult<()> {
            self.inner.upsert_tenant(t).await
        }
    }

    #[tokio::test]
    async fn unknown_leaderboards_leave_nothing_behind() {
        let cache = Arc::new(MemoryCache::new());
        let store = FixedStore { total: 0, present: false };
        let svc = LeaderboardQueryService::new(Arc::new(store), cache.clone(), CacheTtls::default());

        for i in 0..500 {
            let tenant = format!("ghost-{i}");
            let page = svc.get_page(&tenant, "stake", 1, 20).await.unwrap();
            assert_eq!(page.total_pages, 0);
            assert_eq!(svc.get_config(&tenant, "stake").await.unwrap(), serde_json::json!({}));
            assert_eq!(svc.tracked_pages(&tenant, "stake"), 0);
        }
        assert!(cache.is_empty());
        assert_eq!(svc.prune_tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_page_keys_are_no_longer_tracked() {
        let cache = Arc::new(MemoryCache::new());
        let svc = service(10, cache.clone());

        for size in 1..=500 {
            svc.get_page("T", "stake", 1, size).await.unwrap();
        }
        assert_eq!(svc.tracked_pages("T", "stake"), 500);

        tokio::time::advance(CacheTtls::default().data + Duration::from_secs(1)).await;
        assert_eq!(svc.tracked_pages("T", "stake"), 0);
        assert_eq!(cache.purge_expired(), 500);

        // The next populate in the scope drops the stale keys outright.
        svc.get_page("T", "stake", 1, 20).await.unwrap();
        assert_eq!(svc.tracked_pages("T", "stake"), 1);
        assert_eq!(svc.prune_tracked(), 0);

        tokio::time::advance(CacheTtls::default().data + Duration::from_secs(1)).await;
        assert_eq!(svc.prune_tracked(), 1);
    }

    #[tokio::test]
    async fn page_read_overlapping_an_invalidation_is_not_cached() {
        let store = Arc::new(GatedStore {
            inner: FixedStore { total: 3, present: true },
            entered: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(MemoryCache::new());
        let svc = Arc::new(LeaderboardQueryService::new(
            store.clone(),
            cache.clone(),
            CacheTtls::default(),
        ));

        let reader = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.get_page("T", "stake", 1, 20).await }
        });
        store.entered.notified().await;
        svc.invalidate("T", "stake").await.unwrap();
        store.release.notify_one();

        let page = reader.await.unwrap().unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(svc.tracked_pages("T", "stake"), 0);
        let key = keys::page_key("T", "stake", 1, 20);
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_non_positive_page_and_size() {
        let svc = service(10, Arc::new(MemoryCache::new()));
        assert!(matches!(
            svc.get_page("T", "stake", 0, 20).await,
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.get_page("T", "stake", 1, 0).await,
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_store_reads() {
        let svc = service(45, Arc::new(DownCache));
        let page = svc.get_page("T", "stake", 3, 20).await.unwrap();
        assert_eq!(page.entries.len(), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(svc.tracked_pages("T", "stake"), 0);

        let config = svc.get_config("T", "stake").await.unwrap();
        assert_eq!(config["title"], "Weekly");

        assert!(matches!(
            svc.invalidate("T", "stake").await,
            Err(QueryError::Cache(_))
        ));
    }

    #[tokio::test]
    async fn undecodable_cached_page_is_ignored() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set(&keys::page_key("T", "stake", 1, 20), Value::from("garbage"), Duration::from_secs(60))
            .await
            .unwrap();
        let svc = service(2, cache);
        let page = svc.get_page("T", "stake", 1, 20).await.unwrap();
        assert_eq!(page.total, 2);
    }

    proptest! {
        #[test]
        fn pagination_arithmetic(total in 0u64..500, page_size in 1u32..60, page in 1u32..15) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let svc = service(total, Arc::new(MemoryCache::new()));
            let got = rt.block_on(svc.get_page("T", "stake", page, page_size)).unwrap();

            let size = u64::from(page_size);
            prop_assert_eq!(got.total, total);
            prop_assert_eq!(got.total_pages, total.div_ceil(size));
            let offset = u64::from(page - 1) * size;
            let expected = total.saturating_sub(offset).min(size);
            prop_assert_eq!(got.entries.len() as u64, expected);
            prop_assert!(got.entries.len() as u64 <= size);
        }
    }
}
