//! Job executor: dispatches runs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use satchel_core::error::AppError;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTrigger {
    /// The cron schedule fired.
    Scheduled,
    /// The server just started.
    Startup,
    /// An operator asked for it.
    Manual,
}

impl JobTrigger {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Startup => "startup",
            Self::Manual => "manual",
        }
    }
}

/// One execution of a job.
#[derive(Debug, Clone)]
pub struct JobRun {
    /// Unique run id, for log correlation.
    pub id: Uuid,
    /// The handler's job type.
    pub job_type: String,
    /// What started the run.
    pub trigger: JobTrigger,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Fires when the host is shutting down.
    pub cancel: CancellationToken,
}

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute one run
    async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, the next trigger may succeed
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// A run of the same job type is still going
    #[error("Job '{0}' is already running")]
    AlreadyRunning(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches runs to the handler for their job type. At most one run per
/// job type is active at a time.
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    /// One lock per registered job type
    running: HashMap<String, Arc<Mutex<()>>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            running: HashMap::new(),
        }
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.running
            .entry(job_type.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        self.handlers.insert(job_type, handler);
    }

    /// Run a job now, unless a run of the same type is in flight.
    pub async fn execute(
        &self,
        job_type: &str,
        trigger: JobTrigger,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, JobExecutionError> {
        let (Some(handler), Some(lock)) = (self.handlers.get(job_type), self.running.get(job_type))
        else {
            return Err(JobExecutionError::Permanent(format!(
                "No handler registered for job type '{job_type}'"
            )));
        };

        let _guard = lock
            .try_lock()
            .map_err(|_| JobExecutionError::AlreadyRunning(job_type.to_string()))?;

        let run = JobRun {
            id: Uuid::now_v7(),
            job_type: job_type.to_string(),
            trigger,
            started_at: Utc::now(),
            cancel: cancel.child_token(),
        };
        tracing::info!(
            run_id = %run.id,
            job_type = %run.job_type,
            trigger = run.trigger.as_str(),
            "Executing job"
        );

        let result = handler.execute(&run).await;
        let elapsed_ms = (Utc::now() - run.started_at).num_milliseconds();
        match &result {
            Ok(_) => tracing::info!(run_id = %run.id, job_type = %run.job_type, elapsed_ms, "Job finished"),
            Err(e) => tracing::error!(run_id = %run.id, job_type = %run.job_type, elapsed_ms, error = %e, "Job failed"),
        }
        result
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}
