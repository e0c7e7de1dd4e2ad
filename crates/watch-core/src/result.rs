//! Convenience result type alias for RecordWatch.

use crate::error::AppError;

/// A specialized `Result` type for RecordWatch operations.
pub type AppResult<T> = Result<T, AppError>;
