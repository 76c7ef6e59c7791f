//! Persistence boundary for tenants, entries and rollups.
//!
//! [`StoreGateway`] is the only way the rest of the crate reads or writes
//! durable state. Absence is never an error: lookups return `Ok(None)` and
//! listings return empty results.
//!
//! [`sqlite::SqliteStore`] is the Diesel + SQLite implementation.

pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{LeaderboardEntry, LeaderboardRollup, Tenant};

pub use sqlite::SqliteStore;

/// Errors returned by a [`StoreGateway`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not open or configure a connection.
    #[error("store connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// A statement failed.
    #[error("store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A timestamp column did not hold RFC-3339 text.
    #[error("invalid stored timestamp {value:?}: {source}")]
    Timestamp {
        /// Offending column text.
        value: String,
        /// Parser error.
        source: chrono::ParseError,
    },

    /// The blocking task running the statement panicked or was cancelled.
    #[error("store task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One page of entries plus the size of the whole `(tenant, casino)` set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrySlice {
    /// Entries in rank order.
    pub entries: Vec<LeaderboardEntry>,
    /// Total number of entries in scope, independent of offset/limit.
    pub total: u64,
}

/// Durable storage used by ingestion and queries.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Inserts or replaces every entry, keyed by
    /// `(tenant_id, casino_player_id, casino, timestamp)`. All-or-nothing per call.
    /// Returns the number of rows written.
    async fn upsert_entries(&self, entries: &[LeaderboardEntry]) -> StoreResult<usize>;

    /// Creates or updates the rollup for `(tenant_id, casino)` with `snapshot`
    /// and `last_fetched = now`. The stored config is only replaced when `config`
    /// is `Some`; a new rollup starts with `{}`.
    async fn upsert_rollup(
        &self,
        tenant_id: &str,
        casino: &str,
        snapshot: &Value,
        config: Option<&Value>,
    ) -> StoreResult<()>;

    /// Fetches the rollup for `(tenant_id, casino)`.
    async fn get_rollup(&self, tenant_id: &str, casino: &str)
    -> StoreResult<Option<LeaderboardRollup>>;

    /// Lists entries for `(tenant_id, casino)` ordered by rank ascending, then
    /// player id, then timestamp.
    async fn list_entries(
        &self,
        tenant_id: &str,
        casino: &str,
        offset: u64,
        limit: u64,
    ) -> StoreResult<EntrySlice>;

    /// All known tenants, ordered by id.
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    /// One tenant by id.
    async fn get_tenant(&self, tenant_id: &str) -> StoreResult<Option<Tenant>>;

    /// Creates or replaces a tenant by id.
    async fn upsert_tenant(&self, tenant: &Tenant) -> StoreResult<()>;
}
