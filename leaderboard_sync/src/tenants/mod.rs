//! Tenant registration and lookup.
//!
//! - [`config`]: the TOML seed file operators use to register tenants.
//! - [`resolver::TenantResolver`]: cache-then-store lookup by id.
//! - [`sync_tenants`]: writes a normalized seed file into the store.

pub mod config;
pub mod resolver;

use tracing::info;

use crate::{
    models::Tenant,
    store::{StoreGateway, StoreResult},
};

pub use resolver::TenantResolver;

/// Upserts every tenant, returning how many were written. Tenants absent from
/// `tenants` are left untouched.
pub async fn sync_tenants(store: &dyn StoreGateway, tenants: &[Tenant]) -> StoreResult<usize> {
    for tenant in tenants {
        store.upsert_tenant(tenant).await?;
        info!(tenant_id = %tenant.id, slug = %tenant.slug, casino = %tenant.casino, "tenant synced");
    }
    Ok(tenants.len())
}
