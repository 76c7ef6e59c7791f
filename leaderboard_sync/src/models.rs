//! Domain records and the Diesel rows they persist as.
//!
//! Domain types ([`Tenant`], [`LeaderboardEntry`], [`LeaderboardRollup`]) carry
//! typed timestamps and JSON values. Row types mirror [`crate::schema`] where
//! timestamps are RFC-3339 text and JSON blobs are text; conversions live here
//! so the store never hand-assembles either direction.

use casino_feed::models::{entry::NormalizedEntry, raw_row::RawRow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    schema::{leaderboard, leaderboard_entry, tenant},
    store::StoreError,
    tz,
};

/// A customer organization and its upstream feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Stable identifier; every stored row and cache key is namespaced by it.
    pub id: String,
    /// Human-friendly unique handle.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Casino tag selecting the feed adapter (e.g. "stake").
    pub casino: String,
    /// Adapter connection settings (`url`, optional `apiKey`).
    pub api_config: Value,
    /// Free-form tenant settings, opaque to the pipeline.
    pub settings: Value,
}

/// One player's standing for a tenant on a casino at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Owning tenant.
    pub tenant_id: String,
    /// Player identity as assigned by the casino.
    pub casino_player_id: String,
    /// Canonical casino tag.
    pub casino: String,
    /// Amount wagered; never negative.
    pub wager_amount: f64,
    /// 1-based rank.
    pub rank: i32,
    /// Instant the row represents.
    pub timestamp: DateTime<Utc>,
    /// The original upstream row.
    pub data: RawRow,
}

impl LeaderboardEntry {
    /// Attaches the owning tenant to a normalized row.
    pub fn from_normalized(tenant_id: &str, entry: NormalizedEntry) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            casino_player_id: entry.casino_player_id,
            casino: entry.casino,
            wager_amount: entry.wager_amount,
            rank: entry.rank,
            timestamp: entry.timestamp,
            data: entry.data,
        }
    }
}

/// Latest snapshot and display configuration for one `(tenant, casino)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRollup {
    /// Owning tenant.
    pub tenant_id: String,
    /// Canonical casino tag.
    pub casino: String,
    /// When the snapshot was last written.
    pub last_fetched: DateTime<Utc>,
    /// JSON array of the entries from the most recent batch.
    pub data: Value,
    /// Display configuration; `{}` until someone sets it.
    pub leaderboard_config: Value,
}

// ---- rows ----

/// A row in [`crate::schema::tenant`].
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenant, check_for_backend(diesel::sqlite::Sqlite))]
pub struct TenantRow {
    /// Primary key.
    pub id: String,
    /// Unique slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Casino tag.
    pub casino: String,
    /// JSON text.
    pub api_config: String,
    /// JSON text.
    pub settings: String,
}

/// Insertable / changeset form of [`TenantRow`].
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = tenant)]
pub struct NewTenant<'a> {
    /// Primary key.
    pub id: &'a str,
    /// Unique slug.
    pub slug: &'a str,
    /// Display name.
    pub name: &'a str,
    /// Casino tag.
    pub casino: &'a str,
    /// JSON text.
    pub api_config: &'a str,
    /// JSON text.
    pub settings: &'a str,
}

/// A row in [`crate::schema::leaderboard_entry`].
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = leaderboard_entry, check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Player identity.
    pub casino_player_id: String,
    /// Casino tag.
    pub casino: String,
    /// Amount wagered.
    pub wager_amount: f64,
    /// Rank.
    pub rank: i32,
    /// RFC-3339 UTC, millisecond precision.
    pub timestamp: String,
    /// Original row as JSON text.
    pub data: String,
}

/// Insertable / changeset form of [`EntryRow`].
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = leaderboard_entry)]
pub struct NewEntry<'a> {
    /// Owning tenant.
    pub tenant_id: &'a str,
    /// Player identity.
    pub casino_player_id: &'a str,
    /// Casino tag.
    pub casino: &'a str,
    /// Amount wagered.
    pub wager_amount: f64,
    /// Rank.
    pub rank: i32,
    /// RFC-3339 UTC, millisecond precision.
    pub timestamp: String,
    /// Original row as JSON text.
    pub data: String,
}

/// A row in [`crate::schema::leaderboard`].
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = leaderboard, check_for_backend(diesel::sqlite::Sqlite))]
pub struct RollupRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Casino tag.
    pub casino: String,
    /// RFC-3339 UTC, millisecond precision.
    pub last_fetched: String,
    /// Snapshot JSON text.
    pub data: String,
    /// Config JSON text.
    pub leaderboard_config: String,
}

/// Insertable form of [`RollupRow`].
#[derive(Debug, Insertable)]
#[diesel(table_name = leaderboard)]
pub struct NewRollup<'a> {
    /// Owning tenant.
    pub tenant_id: &'a str,
    /// Casino tag.
    pub casino: &'a str,
    /// RFC-3339 UTC, millisecond precision.
    pub last_fetched: &'a str,
    /// Snapshot JSON text.
    pub data: &'a str,
    /// Config JSON text.
    pub leaderboard_config: &'a str,
}

// ---- conversions ----

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StoreError> {
    tz::parse_ts_to_utc(value).map_err(|source| StoreError::Timestamp {
        value: value.to_string(),
        source,
    })
}

impl TryFrom<TenantRow> for Tenant {
    type Error = StoreError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            api_config: serde_json::from_str(&row.api_config)?,
            settings: serde_json::from_str(&row.settings)?,
            id: row.id,
            slug: row.slug,
            name: row.name,
            casino: row.casino,
        })
    }
}

impl TryFrom<EntryRow> for LeaderboardEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: parse_ts(&row.timestamp)?,
            data: serde_json::from_str(&row.data)?,
            tenant_id: row.tenant_id,
            casino_player_id: row.casino_player_id,
            casino: row.casino,
            wager_amount: row.wager_amount,
            rank: row.rank,
        })
    }
}

impl TryFrom<RollupRow> for LeaderboardRollup {
    type Error = StoreError;

    fn try_from(row: RollupRow) -> Result<Self, Self::Error> {
        Ok(Self {
            last_fetched: parse_ts(&row.last_fetched)?,
            data: serde_json::from_str(&row.data)?,
            leaderboard_config: serde_json::from_str(&row.leaderboard_config)?,
            tenant_id: row.tenant_id,
            casino: row.casino,
        })
    }
}

impl<'a> NewEntry<'a> {
    /// Encodes a domain entry for insertion.
    pub fn encode(entry: &'a LeaderboardEntry) -> Result<Self, StoreError> {
        Ok(Self {
            tenant_id: &entry.tenant_id,
            casino_player_id: &entry.casino_player_id,
            casino: &entry.casino,
            wager_amount: entry.wager_amount,
            rank: entry.rank,
            timestamp: tz::to_rfc3339_millis(entry.timestamp),
            data: serde_json::to_string(&entry.data)?,
        })
    }
}
