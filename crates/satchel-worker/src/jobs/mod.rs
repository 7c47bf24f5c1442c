//! Built-in job handler implementations.

pub mod content_requests;

pub use content_requests::{CONTENT_REQUESTS_JOB, ContentRequestsJob};
