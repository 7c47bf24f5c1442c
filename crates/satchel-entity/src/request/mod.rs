//! Content request domain entities.

pub mod model;
pub mod status;

pub use model::{AnnotatedRequest, ContentRequest, CreateContentRequest, RequestFilter};
pub use status::{RequestKind, RequestReason, RequestStatus};
