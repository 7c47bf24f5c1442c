//! The periodic content requests job.

use async_trait::async_trait;
use serde_json::Value;

use satchel_service::{EngineContext, PassOutcome, ReconciliationPass};

use crate::executor::{JobExecutionError, JobHandler, JobRun};

/// Job type name used for scheduling and locking.
pub const CONTENT_REQUESTS_JOB: &str = "content_requests";

/// Runs one reconciliation pass per trigger.
#[derive(Debug, Clone)]
pub struct ContentRequestsJob {
    ctx: EngineContext,
}

impl ContentRequestsJob {
    /// Create the job.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for ContentRequestsJob {
    fn job_type(&self) -> &str {
        CONTENT_REQUESTS_JOB
    }

    async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let pass = ReconciliationPass::new(self.ctx.clone())
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid pass configuration: {e}")))?;

        let outcome = pass
            .run(&run.cancel)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Reconciliation pass failed: {e}")))?;

        if let PassOutcome::InsufficientStorage { message, .. } = &outcome {
            tracing::warn!(run_id = %run.id, "{message}");
        }

        serde_json::to_value(&outcome)
            .map(Some)
            .map_err(|e| JobExecutionError::Internal(e.into()))
    }
}
