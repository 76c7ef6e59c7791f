//! Cached single-tenant lookup.

use std::{sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    cache::{CacheStore, keys},
    models::Tenant,
    store::{StoreGateway, StoreResult},
};

/// Resolves tenants by id, cache first.
///
/// Only found tenants are cached, so a tenant created after a miss is visible
/// on the next lookup.
pub struct TenantResolver {
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl TenantResolver {
    /// Creates a resolver caching hits for `ttl`.
    pub fn new(store: Arc<dyn StoreGateway>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Looks up `tenant_id`. Store errors propagate; cache errors are logged.
    pub async fn resolve(&self, tenant_id: &str) -> StoreResult<Option<Tenant>> {
        let key = keys::tenant_key(tenant_id);
        match self.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Tenant>(value) {
                Ok(tenant) => return Ok(Some(tenant)),
                Err(err) => warn!(%key, error = %err, "discarding undecodable tenant cache entry"),
            },
            Ok(None) => {}
            Err(err) => warn!(%key, error = %err, "tenant cache read failed"),
        }

        let Some(tenant) = self.store.get_tenant(tenant_id).await? else {
            return Ok(None);
        };

        match serde_json::to_value(&tenant) {
            Ok(value) => {
                if let Err(err) = self.cache.set(&key, value, self.ttl).await {
                    warn!(%key, error = %err, "tenant cache write failed");
                }
            }
            Err(err) => warn!(%key, error = %err, "could not encode tenant for cache"),
        }
        Ok(Some(tenant))
    }

    /// Drops the cached copy of `tenant_id`.
    pub async fn forget(&self, tenant_id: &str) {
        let key = keys::tenant_key(tenant_id);
        if let Err(err) = self.cache.delete(&key).await {
            warn!(%key, error = %err, "tenant cache delete failed");
        }
    }
}
