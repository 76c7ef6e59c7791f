//! Multi-tenant leaderboard ingestion, persistence and cached queries.
//!
//! Data flows one way: partner feeds ([`casino_feed`]) are fetched and
//! normalized by the [`ingest`] orchestrator, written through a
//! [`store::StoreGateway`], and read back by [`query::LeaderboardQueryService`]
//! behind a TTL [`cache`]. Every stored row and cache key is namespaced by
//! tenant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use leaderboard_sync::{
//!     cache::{CacheTtls, MemoryCache},
//!     ingest::{AdapterRegistry, IngestOptions, IngestionOrchestrator},
//!     query::LeaderboardQueryService,
//!     store::SqliteStore,
//! };
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(SqliteStore::new("leaderboard.db"));
//! let cache = Arc::new(MemoryCache::new());
//! let queries = Arc::new(LeaderboardQueryService::new(store.clone(), cache, CacheTtls::default()));
//!
//! let registry = AdapterRegistry::with_defaults(std::time::Duration::from_secs(30))?;
//! let orchestrator = IngestionOrchestrator::new(store, registry, IngestOptions::default())
//!     .with_invalidator(queries.clone());
//! let report = orchestrator.run_all().await?;
//! println!("{report}");
//!
//! let page = queries.get_page("tenant-acme", "stake", 1, 20).await?;
//! println!("{} of {} entries", page.entries.len(), page.total);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod ingest;
pub mod models;
pub mod query;
pub mod scheduler;
#[allow(missing_docs)]
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod tenants;
pub mod tz;
