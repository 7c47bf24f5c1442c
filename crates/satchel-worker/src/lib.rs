//! Background jobs and scheduled tasks for Satchel.
//!
//! This crate provides:
//! - A job executor that dispatches runs to handlers and refuses to start a
//!   job type that is already running
//! - A cron scheduler that triggers the content requests job
//! - The content requests job, which runs one reconciliation pass

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler, JobRun, JobTrigger};
pub use jobs::{CONTENT_REQUESTS_JOB, ContentRequestsJob};
pub use scheduler::CronScheduler;
