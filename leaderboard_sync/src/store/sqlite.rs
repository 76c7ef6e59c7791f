//! Diesel + SQLite [`StoreGateway`].
//!
//! Every call opens its own connection through
//! [`connect_sqlite`](crate::db::connection::connect_sqlite) on the blocking
//! pool, so no connection or lock is ever held across an `.await`. Writes run
//! inside `BEGIN IMMEDIATE` transactions; SQLite's busy timeout serializes
//! concurrent writers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::{SqliteConnection, prelude::*};
use serde_json::Value;
use tracing::debug;

use crate::{
    db::connection::connect_sqlite,
    models::{
        EntryRow, LeaderboardEntry, LeaderboardRollup, NewEntry, NewRollup, NewTenant, RollupRow,
        Tenant, TenantRow,
    },
    schema::{leaderboard::dsl as lb, leaderboard_entry::dsl as le, tenant::dsl as t},
    store::{EntrySlice, StoreError, StoreGateway, StoreResult},
    tz,
};

/// SQLite-backed store addressed by a database URL or path.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database_url: Arc<str>,
}

impl SqliteStore {
    /// Creates a store for `database_url`. No connection is opened until first use.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: Arc::from(database_url.into()),
        }
    }

    /// The URL this store connects to.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let url = Arc::clone(&self.database_url);
        tokio::task::spawn_blocking(move || {
            let mut conn = connect_sqlite(&url)?;
            f(&mut conn)
        })
        .await?
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl StoreGateway for SqliteStore {
    async fn upsert_entries(&self, entries: &[LeaderboardEntry]) -> StoreResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let entries = entries.to_vec();

        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                let mut written = 0;
                for entry in &entries {
                    let row = NewEntry::encode(entry)?;
                    written += diesel::insert_into(le::leaderboard_entry)
                        .values(&row)
                        .on_conflict((le::tenant_id, le::casino_player_id, le::casino, le::timestamp))
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                }
                debug!(rows = written, "upserted leaderboard entries");
                Ok(written)
            })
        })
        .await
    }

    async fn upsert_rollup(
        &self,
        tenant_id: &str,
        casino: &str,
        snapshot: &Value,
        config: Option<&Value>,
    ) -> StoreResult<()> {
        let tenant_id = tenant_id.to_string();
        let casino = casino.to_string();
        let snapshot = serde_json::to_string(snapshot)?;
        let config = config.map(serde_json::to_string).transpose()?;
        let now = tz::to_rfc3339_millis(Utc::now());

        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                let row = NewRollup {
                    tenant_id: &tenant_id,
                    casino: &casino,
                    last_fetched: &now,
                    data: &snapshot,
                    leaderboard_config: config.as_deref().unwrap_or("{}"),
                };
                let upsert = diesel::insert_into(lb::leaderboard)
                    .values(&row)
                    .on_conflict((lb::tenant_id, lb::casino))
                    .do_update();

                match config.as_deref() {
                    Some(cfg) => upsert
                        .set((
                            lb::last_fetched.eq(now.as_str()),
                            lb::data.eq(snapshot.as_str()),
                            lb::leaderboard_config.eq(cfg),
                        ))
                        .execute(conn)?,
                    None => upsert
                        .set((
                            lb::last_fetched.eq(now.as_str()),
                            lb::data.eq(snapshot.as_str()),
                        ))
                        .execute(conn)?,
                };
                Ok(())
            })
        })
        .await
    }

    async fn get_rollup(
        &self,
        tenant_id: &str,
        casino: &str,
    ) -> StoreResult<Option<LeaderboardRollup>> {
        let tenant_id = tenant_id.to_string();
        let casino = casino.to_string();

        self.with_conn(move |conn| {
            let row = lb::leaderboard
                .filter(lb::tenant_id.eq(&tenant_id).and(lb::casino.eq(&casino)))
                .select(RollupRow::as_select())
                .first(conn)
                .optional()?;
            row.map(LeaderboardRollup::try_from).transpose()
        })
        .await
    }

    async fn list_entries(
        &self,
        tenant_id: &str,
        casino: &str,
        offset: u64,
        limit: u64,
    ) -> StoreResult<EntrySlice> {
        let tenant_id = tenant_id.to_string();
        let casino = casino.to_string();

        self.with_conn(move |conn| {
            // One read transaction so `total` and the page come from the same snapshot.
            conn.transaction(|conn| {
                let total: i64 = le::leaderboard_entry
                    .filter(le::tenant_id.eq(&tenant_id).and(le::casino.eq(&casino)))
                    .count()
                    .get_result(conn)?;

                let rows: Vec<EntryRow> = le::leaderboard_entry
                    .filter(le::tenant_id.eq(&tenant_id).and(le::casino.eq(&casino)))
                    .order((
                        le::rank.asc(),
                        le::casino_player_id.asc(),
                        le::timestamp.asc(),
                    ))
                    .offset(to_i64(offset))
                    .limit(to_i64(limit))
                    .select(EntryRow::as_select())
                    .load(conn)?;

                let entries = rows
                    .into_iter()
                    .map(LeaderboardEntry::try_from)
                    .collect::<Result<Vec<_>, StoreError>>()?;

                Ok(EntrySlice {
                    entries,
                    total: u64::try_from(total).unwrap_or_default(),
                })
            })
        })
        .await
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        self.with_conn(|conn| {
            t::tenant
                .order(t::id.asc())
                .select(TenantRow::as_select())
                .load(conn)?
                .into_iter()
                .map(Tenant::try_from)
                .collect()
        })
        .await
    }

    async fn get_tenant(&self, tenant_id: &str) -> StoreResult<Option<Tenant>> {
        let tenant_id = tenant_id.to_string();

        self.with_conn(move |conn| {
            let row = t::tenant
                .find(&tenant_id)
                .select(TenantRow::as_select())
                .first(conn)
                .optional()?;
            row.map(Tenant::try_from).transpose()
        })
        .await
    }

    async fn upsert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let tenant = tenant.clone();
        let api_config = serde_json::to_string(&tenant.api_config)?;
        let settings = serde_json::to_string(&tenant.settings)?;

        self.with_conn(move |conn| {
            let row = NewTenant {
                id: &tenant.id,
                slug: &tenant.slug,
                name: &tenant.name,
                casino: &tenant.casino,
                api_config: &api_config,
                settings: &settings,
            };
            diesel::insert_into(t::tenant)
                .values(&row)
                .on_conflict(t::id)
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
