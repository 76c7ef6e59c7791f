//! Recurring ingestion trigger.
//!
//! [`IngestionScheduler`] fires [`IngestionOrchestrator::run_all`] on a cron
//! schedule (top of every hour by default). Runs never overlap: a tick that
//! arrives while the previous run is still going is skipped and logged.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::ingest::{IngestError, IngestionOrchestrator, RunReport};

/// Top of every hour (`sec min hour dom mon dow`).
pub const DEFAULT_CRON: &str = "0 0 * * * *";

/// Single-flight flag shared by every trigger of one scheduler.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Proof of holding a [`RunGuard`]; releases it on drop.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    /// Takes the guard unless a run is already in progress.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    /// `true` while some caller holds a [`RunPermit`].
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// An orchestrator paired with its overlap guard. Cheap to clone.
#[derive(Clone)]
pub struct GuardedIngest {
    orchestrator: IngestionOrchestrator,
    guard: RunGuard,
}

impl GuardedIngest {
    /// Wraps `orchestrator` with a fresh guard.
    pub fn new(orchestrator: IngestionOrchestrator) -> Self {
        Self {
            orchestrator,
            guard: RunGuard::default(),
        }
    }

    /// Runs ingestion unless a run is in flight. `None` means skipped.
    pub async fn run(&self) -> Option<Result<RunReport, IngestError>> {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!("previous ingestion run still in progress, skipping");
            return None;
        };
        Some(self.orchestrator.run_all().await)
    }

    /// The guard, for observing whether a run is in flight.
    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }
}

/// Cron-driven ingestion.
pub struct IngestionScheduler {
    ingest: GuardedIngest,
    cron: String,
    scheduler: Option<JobScheduler>,
}

impl IngestionScheduler {
    /// Creates a stopped scheduler for `cron`.
    pub fn new(orchestrator: IngestionOrchestrator, cron: impl Into<String>) -> Self {
        Self {
            ingest: GuardedIngest::new(orchestrator),
            cron: cron.into(),
            scheduler: None,
        }
    }

    /// Runs the same guarded ingestion the timer would, right now.
    pub async fn trigger_now(&self) -> Option<Result<RunReport, IngestError>> {
        self.ingest.run().await
    }

    /// The guarded runner shared with the timer.
    pub fn ingest(&self) -> &GuardedIngest {
        &self.ingest
    }

    /// Registers the cron job and starts ticking. Idempotent.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let sched = JobScheduler::new().await.context("creating scheduler")?;

        let ingest = self.ingest.clone();
        let job = Job::new_async(self.cron.as_str(), move |_uuid, _lock| {
            let ingest = ingest.clone();
            Box::pin(async move {
                match ingest.run().await {
                    Some(Ok(report)) => info!(summary = %report, "scheduled ingestion finished"),
                    Some(Err(err)) => error!(error = %err, "scheduled ingestion failed"),
                    None => {}
                }
            })
        })
        .with_context(|| format!("creating scheduler job for cron {}", self.cron))?;

        sched.add(job).await.context("adding scheduler job")?;
        sched.start().await.context("starting scheduler")?;
        info!(cron = %self.cron, "ingestion scheduler started");
        self.scheduler = Some(sched);
        Ok(())
    }

    /// Stops ticking. A run already in flight is not interrupted.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(mut sched) = self.scheduler.take() {
            sched.shutdown().await.context("stopping scheduler")?;
            info!("ingestion scheduler stopped");
        }
        Ok(())
    }
}

/// Checks that `cron` is a schedule the scheduler accepts.
pub fn validate_cron(cron: &str) -> anyhow::Result<()> {
    Job::new_async(cron, |_uuid, _lock| Box::pin(async {}))
        .map(|_| ())
        .with_context(|| format!("invalid cron expression {cron:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_single_flight_and_released_on_drop() {
        let guard = RunGuard::default();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_running());
        assert!(guard.clone().try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn cron_validation() {
        assert!(validate_cron(DEFAULT_CRON).is_ok());
        assert!(validate_cron("every hour").is_err());
    }
}
