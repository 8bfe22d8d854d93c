use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use crate::services::sync_coordinator::{SyncCoordinator, SyncOutcome};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Auto-sync interval must be greater than zero")]
    ZeroInterval,
}

/// Recurring auto-sync. At most one job is armed; arming again replaces it.
pub struct AutoSyncScheduler {
    scheduler: Arc<Mutex<JobScheduler>>,
    coordinator: Arc<SyncCoordinator>,
    // job id and interval of the armed job
    active_job: Arc<Mutex<Option<(Uuid, Duration)>>>,
}

impl AutoSyncScheduler {
    pub async fn new(coordinator: Arc<SyncCoordinator>) -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            coordinator,
            active_job: Arc::new(Mutex::new(None)),
        })
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        let scheduler = self.scheduler.lock().await;
        scheduler.start().await?;

        tracing::info!("✅ Auto-sync scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.shutdown().await?;

        tracing::info!("🛑 Auto-sync scheduler stopped");
        Ok(())
    }

    /// Arm a recurring sync every `interval`, replacing any armed job.
    /// Each tick goes through the coordinator's in-progress guard.
    pub async fn schedule(&self, interval: Duration) -> Result<Uuid, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }

        let mut active_job = self.active_job.lock().await;
        let scheduler = self.scheduler.lock().await;

        if let Some((previous_job, previous_interval)) = active_job.take() {
            scheduler.remove(&previous_job).await?;
            tracing::info!("♻️ Replacing auto-sync every {:?} with every {:?}", previous_interval, interval);
        }

        let coordinator = self.coordinator.clone();
        let sync_job = Job::new_repeated_async(interval, move |_uuid, _l| {
            let coordinator = coordinator.clone();

            Box::pin(async move {
                tracing::info!("⏰ Running scheduled sync");
                match coordinator.perform_sync().await {
                    SyncOutcome::Completed { report } => {
                        tracing::info!("✅ Scheduled sync completed ({} sessions merged)",
                            report.sessions_inserted + report.sessions_updated);
                    }
                    SyncOutcome::Failed { reason, .. } => {
                        tracing::error!("❌ Scheduled sync failed: {}", reason);
                    }
                    SyncOutcome::Skipped => {
                        tracing::info!("⏭️ Scheduled sync skipped, a cycle is already running");
                    }
                }
            })
        })?;

        let job_id = sync_job.guid();
        scheduler.add(sync_job).await?;
        *active_job = Some((job_id, interval));

        tracing::info!("✅ Scheduled auto-sync every {:?}", interval);
        Ok(job_id)
    }

    /// Disarm auto-sync. Returns whether a job was armed.
    pub async fn cancel(&self) -> Result<bool, SchedulerError> {
        let mut active_job = self.active_job.lock().await;

        if let Some((job_id, _)) = active_job.take() {
            let scheduler = self.scheduler.lock().await;
            scheduler.remove(&job_id).await?;
            tracing::info!("✅ Auto-sync cancelled");
            return Ok(true);
        }

        Ok(false)
    }

    pub async fn active_interval(&self) -> Option<Duration> {
        let active_job = *self.active_job.lock().await;
        active_job.map(|(_, interval)| interval)
    }
}
