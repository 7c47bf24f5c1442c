//! Cron scheduler for periodic jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tokio_util::sync::CancellationToken;

use satchel_core::config::worker::WorkerConfig;
use satchel_core::error::AppError;

use crate::executor::{JobExecutionError, JobExecutor, JobTrigger};
use crate::jobs::CONTENT_REQUESTS_JOB;

/// Cron-based scheduler that triggers jobs on the executor
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Executor the triggers dispatch to
    executor: Arc<JobExecutor>,
    /// Cancelled on shutdown; runs receive a child token
    cancel: CancellationToken,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("executor", &self.executor)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(executor: Arc<JobExecutor>, cancel: CancellationToken) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            executor,
            cancel,
        })
    }

    /// Register the scheduled tasks enabled by the worker configuration
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register(CONTENT_REQUESTS_JOB, &config.content_requests_schedule)
            .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Trigger `job_type` on `schedule`. Triggers that find the previous run
    /// still going are skipped.
    pub async fn register(&self, job_type: &'static str, schedule: &str) -> Result<(), AppError> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "No handler registered for scheduled job '{job_type}'"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let cancel = self.cancel.clone();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let cancel = cancel.clone();
            Box::pin(async move {
                if cancel.is_cancelled() {
                    return;
                }
                match executor.execute(job_type, JobTrigger::Scheduled, &cancel).await {
                    Ok(_) => {}
                    Err(JobExecutionError::AlreadyRunning(_)) => {
                        tracing::debug!(job_type, "Previous run still active, skipping trigger");
                    }
                    Err(e) => tracing::error!(job_type, error = %e, "Scheduled job failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {job_type}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job_type, schedule, "Registered scheduled job");
        Ok(())
    }

    /// Run a job once in the background, outside the schedule
    pub fn trigger_now(&self, job_type: &'static str, trigger: JobTrigger) -> tokio::task::JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = executor.execute(job_type, trigger, &cancel).await {
                tracing::warn!(job_type, trigger = trigger.as_str(), error = %e, "Job run failed");
            }
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Cancel in-flight runs and shut the scheduler down
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.cancel.cancel();
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
