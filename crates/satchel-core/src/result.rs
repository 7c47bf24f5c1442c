//! Convenience result type alias for Satchel.

use crate::error::AppError;

/// A specialized `Result` type for Satchel operations.
pub type AppResult<T> = Result<T, AppError>;
