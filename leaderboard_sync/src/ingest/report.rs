//! Per-run outcome summary.

use std::fmt;

use serde::Serialize;

/// What happened to one tenant during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TenantOutcome {
    /// Entries and rollup were written.
    Stored {
        /// Number of entries upserted.
        entries: usize,
    },
    /// The feed returned no rows; nothing was written.
    Empty,
    /// No adapter is registered for the tenant's casino tag.
    Unsupported {
        /// The tag as configured on the tenant.
        casino: String,
    },
    /// Configuration, fetch, parse or store failure.
    Failed {
        /// Rendered error.
        error: String,
    },
}

/// One tenant's line in a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantRun {
    /// Tenant id.
    pub tenant_id: String,
    /// Result for that tenant.
    pub outcome: TenantOutcome,
}

/// Result of [`run_all`](crate::ingest::IngestionOrchestrator::run_all).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// One line per tenant, ordered by tenant id.
    pub tenants: Vec<TenantRun>,
}

impl RunReport {
    /// Adds a tenant's outcome.
    pub fn record(&mut self, tenant_id: impl Into<String>, outcome: TenantOutcome) {
        self.tenants.push(TenantRun {
            tenant_id: tenant_id.into(),
            outcome,
        });
    }

    /// Outcome for `tenant_id`, if it was part of the run.
    pub fn outcome(&self, tenant_id: &str) -> Option<&TenantOutcome> {
        self.tenants
            .iter()
            .find(|run| run.tenant_id == tenant_id)
            .map(|run| &run.outcome)
    }

    /// Tenants whose entries were written.
    pub fn stored(&self) -> usize {
        self.count(|o| matches!(o, TenantOutcome::Stored { .. }))
    }

    /// Tenants whose feed was empty.
    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, TenantOutcome::Empty))
    }

    /// Tenants skipped for an unsupported casino.
    pub fn unsupported(&self) -> usize {
        self.count(|o| matches!(o, TenantOutcome::Unsupported { .. }))
    }

    /// Tenants that failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TenantOutcome::Failed { .. }))
    }

    /// Entries written across all tenants.
    pub fn entries_written(&self) -> usize {
        self.tenants
            .iter()
            .map(|run| match run.outcome {
                TenantOutcome::Stored { entries } => entries,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&TenantOutcome) -> bool) -> usize {
        self.tenants.iter().filter(|run| pred(&run.outcome)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tenants: {} stored ({} entries), {} empty, {} unsupported, {} failed",
            self.tenants.len(),
            self.stored(),
            self.entries_written(),
            self.empty(),
            self.unsupported(),
            self.failed()
        )
    }
}
