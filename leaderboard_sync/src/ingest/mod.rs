//! Ingestion: fetch every tenant's feed, normalize, persist, invalidate.
//!
//! [`IngestionOrchestrator::run_all`] is the scheduled entry point. Each tenant
//! runs in its own task so a failure, or a panic, in one tenant is recorded in
//! the [`RunReport`] and never reaches the others. Retries for transient fetch
//! failures are owned here, not by the adapters.

pub mod registry;
pub mod report;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use casino_feed::{
    models::{feed_config::FeedConfig, raw_row::RawRow},
    normalize::normalize_rows,
    providers::{FeedProvider, ProviderError},
};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::{
    models::{LeaderboardEntry, Tenant},
    query::QueryError,
    store::{StoreError, StoreGateway},
};

pub use registry::AdapterRegistry;
pub use report::{RunReport, TenantOutcome, TenantRun};

/// Errors for a single tenant's ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No adapter is registered for the tenant's casino tag.
    #[error("unsupported casino: {casino}")]
    UnsupportedCasino {
        /// The tag as configured on the tenant.
        casino: String,
    },

    /// Configuration, fetch or parse failure in the adapter layer.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Persisting entries or the rollup failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The requested tenant does not exist.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),
}

/// Receives "this leaderboard changed" signals after a successful write.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drops cached data for `(tenant_id, casino)`, returning how many keys went away.
    async fn invalidate(&self, tenant_id: &str, casino: &str) -> Result<usize, QueryError>;
}

/// Tuning for [`IngestionOrchestrator`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Attempts per fetch, including the first. Only transport and HTTP status
    /// failures are retried.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub retry_base_delay: Duration,
    /// Upper bound on tenants processed at once.
    pub max_concurrent_tenants: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_base_delay: Duration::from_millis(500),
            max_concurrent_tenants: 4,
        }
    }
}

/// Drives adapters, the normalizer and the store for every tenant.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    store: Arc<dyn StoreGateway>,
    registry: Arc<AdapterRegistry>,
    invalidator: Option<Arc<dyn CacheInvalidator>>,
    options: IngestOptions,
}

impl IngestionOrchestrator {
    /// Creates an orchestrator without cache invalidation.
    pub fn new(
        store: Arc<dyn StoreGateway>,
        registry: AdapterRegistry,
        options: IngestOptions,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            invalidator: None,
            options,
        }
    }

    /// Signals `invalidator` after every successful tenant write.
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Ingests every tenant the store knows about.
    ///
    /// Fails only if the tenant list cannot be loaded; per-tenant problems are
    /// reported in the returned [`RunReport`].
    pub async fn run_all(&self) -> Result<RunReport, IngestError> {
        let tenants = self.store.list_tenants().await?;
        info!(tenants = tenants.len(), "ingestion run started");

        let limit = Arc::new(Semaphore::new(self.options.max_concurrent_tenants.max(1)));
        let mut handles = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let this = self.clone();
            let limit = Arc::clone(&limit);
            let tenant_id = tenant.id.clone();
            let handle = tokio::spawn(async move {
                // `limit` is never closed.
                let _permit = limit.acquire_owned().await.ok();
                this.outcome_for(&tenant).await
            });
            handles.push((tenant_id, handle));
        }

        let mut report = RunReport::default();
        for (tenant_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(%tenant_id, error = %err, "tenant ingestion task aborted");
                    TenantOutcome::Failed {
                        error: format!("ingestion task aborted: {err}"),
                    }
                }
            };
            report.record(tenant_id, outcome);
        }

        info!(summary = %report, "ingestion run finished");
        Ok(report)
    }

    /// Ingests one tenant by id.
    pub async fn run_tenant(&self, tenant_id: &str) -> Result<TenantOutcome, IngestError> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| IngestError::TenantNotFound(tenant_id.to_string()))?;
        Ok(self.outcome_for(&tenant).await)
    }

    /// Runs the full pipeline for `tenant`, returning the number of entries
    /// written (0 when the feed was empty).
    pub async fn run_for(&self, tenant: &Tenant) -> Result<usize, IngestError> {
        let Some((casino, provider)) = self.registry.resolve(&tenant.casino) else {
            return Err(IngestError::UnsupportedCasino {
                casino: tenant.casino.clone(),
            });
        };

        let config = FeedConfig::from_api_config(&tenant.api_config)?;
        let rows = self
            .fetch_with_retry(provider.as_ref(), &config, &tenant.id)
            .await?;

        let normalized = normalize_rows(casino, rows, Utc::now());
        if normalized.is_empty() {
            warn!(tenant_id = %tenant.id, %casino, "feed returned no rows, nothing stored");
            return Ok(0);
        }

        let snapshot = serde_json::to_value(&normalized).map_err(StoreError::from)?;
        let entries: Vec<LeaderboardEntry> = normalized
            .into_iter()
            .map(|entry| LeaderboardEntry::from_normalized(&tenant.id, entry))
            .collect();

        let written = self.store.upsert_entries(&entries).await?;
        self.store
            .upsert_rollup(&tenant.id, casino.as_str(), &snapshot, None)
            .await?;
        info!(tenant_id = %tenant.id, %casino, entries = entries.len(), rows_written = written, "stored leaderboard");

        if let Some(invalidator) = &self.invalidator {
            if let Err(err) = invalidator.invalidate(&tenant.id, casino.as_str()).await {
                warn!(tenant_id = %tenant.id, %casino, error = %err, "cache invalidation failed after ingestion");
            }
        }

        Ok(entries.len())
    }

    async fn outcome_for(&self, tenant: &Tenant) -> TenantOutcome {
        match self.run_for(tenant).await {
            Ok(0) => TenantOutcome::Empty,
            Ok(entries) => TenantOutcome::Stored { entries },
            Err(IngestError::UnsupportedCasino { casino }) => {
                warn!(tenant_id = %tenant.id, %casino, "no adapter for casino, tenant skipped");
                TenantOutcome::Unsupported { casino }
            }
            Err(err) => {
                error!(tenant_id = %tenant.id, error = %err, "tenant ingestion failed");
                TenantOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        provider: &dyn FeedProvider,
        config: &FeedConfig,
        tenant_id: &str,
    ) -> Result<Vec<RawRow>, ProviderError> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match provider.fetch_rows(config).await {
                Ok(rows) => return Ok(rows),
                Err(err) if err.is_fetch_failure() && attempt < max_attempts => {
                    let delay = self
                        .options
                        .retry_base_delay
                        .saturating_mul(1 << (attempt - 1).min(16));
                    warn!(tenant_id, attempt, ?delay, error = %err, "feed fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
