//! Service configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an empty
//! file (or no file) is a valid configuration:
//!
//! ```toml
//! [database]
//! url = "leaderboard.db"
//!
//! [schedule]
//! cron = "0 0 * * * *"
//!
//! [fetch]
//! timeout_secs = 30
//! max_attempts = 2
//! retry_base_delay_ms = 500
//!
//! [cache]
//! data_ttl_secs = 300
//! config_ttl_secs = 300
//! tenant_ttl_secs = 3600
//!
//! [ingest]
//! max_concurrent_tenants = 4
//! ```
//!
//! `DATABASE_URL` in the environment overrides `[database] url`. Cache TTLs
//! above 30 days and fetch timeouts above an hour are rejected.

use std::{path::Path, time::Duration};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shared_utils::env::get_env_var;

use crate::{
    cache::{self, CacheTtls},
    ingest::IngestOptions,
};

const MAX_FETCH_TIMEOUT_SECS: u64 = 3600;

/// Environment variable overriding the database location.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Where the SQLite database lives.
    pub database: DatabaseCfg,
    /// When scheduled ingestion runs.
    pub schedule: ScheduleCfg,
    /// Upstream fetch behavior.
    pub fetch: FetchCfg,
    /// Cache lifetimes.
    pub cache: CacheCfg,
    /// Ingestion fan-out.
    pub ingest: IngestCfg,
}

/// `[database]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseCfg {
    /// SQLite path or `sqlite:` URL.
    pub url: String,
}

impl Default for DatabaseCfg {
    fn default() -> Self {
        Self {
            url: "leaderboard.db".to_string(),
        }
    }
}

/// `[schedule]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleCfg {
    /// Six-field cron expression (seconds first).
    pub cron: String,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            cron: crate::scheduler::DEFAULT_CRON.to_string(),
        }
    }
}

/// `[fetch]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchCfg {
    /// Per-request timeout for partner feeds.
    pub timeout_secs: u64,
    /// Attempts per fetch, including the first.
    pub max_attempts: u32,
    /// First retry delay; doubled per retry.
    pub retry_base_delay_ms: u64,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 2,
            retry_base_delay_ms: 500,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheCfg {
    /// Leaderboard page TTL.
    pub data_ttl_secs: u64,
    /// Leaderboard config TTL.
    pub config_ttl_secs: u64,
    /// Tenant lookup TTL.
    pub tenant_ttl_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        let ttls = CacheTtls::default();
        Self {
            data_ttl_secs: ttls.data.as_secs(),
            config_ttl_secs: ttls.config.as_secs(),
            tenant_ttl_secs: ttls.tenant.as_secs(),
        }
    }
}

/// `[ingest]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestCfg {
    /// Tenants processed at once.
    pub max_concurrent_tenants: usize,
}

impl Default for IngestCfg {
    fn default() -> Self {
        Self {
            max_concurrent_tenants: 4,
        }
    }
}

impl SyncConfig {
    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            bail!("[database] url cannot be empty");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("[fetch] timeout_secs must be > 0");
        }
        if self.fetch.max_attempts == 0 {
            bail!("[fetch] max_attempts must be >= 1");
        }
        if self.fetch.timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            bail!("[fetch] timeout_secs must be <= {MAX_FETCH_TIMEOUT_SECS}");
        }
        if self.ingest.max_concurrent_tenants == 0 {
            bail!("[ingest] max_concurrent_tenants must be >= 1");
        }
        let max_ttl = cache::MAX_TTL.as_secs();
        for (name, secs) in [
            ("data_ttl_secs", self.cache.data_ttl_secs),
            ("config_ttl_secs", self.cache.config_ttl_secs),
            ("tenant_ttl_secs", self.cache.tenant_ttl_secs),
        ] {
            if secs > max_ttl {
                bail!("[cache] {name} must be <= {max_ttl}, got {secs}");
            }
        }
        Ok(())
    }

    /// Applies environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = get_env_var(DATABASE_URL_ENV) {
            self.database.url = url.trim().to_string();
        }
    }

    /// Request timeout for feed adapters.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    /// Cache lifetimes.
    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            data: Duration::from_secs(self.cache.data_ttl_secs),
            config: Duration::from_secs(self.cache.config_ttl_secs),
            tenant: Duration::from_secs(self.cache.tenant_ttl_secs),
        }
    }

    /// Orchestrator tuning.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_attempts: self.fetch.max_attempts,
            retry_base_delay: Duration::from_millis(self.fetch.retry_base_delay_ms),
            max_concurrent_tenants: self.ingest.max_concurrent_tenants,
        }
    }
}

/// Parse + validate from a TOML string (no environment overrides).
pub fn load_config_str(s: &str) -> anyhow::Result<SyncConfig> {
    let cfg: SyncConfig = toml::from_str(s).context("parsing config TOML")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `path` if given (defaults otherwise), then applies environment
/// overrides and validates.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SyncConfig> {
    let mut cfg = match path {
        Some(path) => {
            let s = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SyncConfig::default(),
    };
    cfg.apply_env();
    cfg.validate()?;
    Ok(cfg)
}
