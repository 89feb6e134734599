//! Convenience result type alias for voxconv.

use crate::error::AppError;

/// A specialized `Result` type for voxconv operations at the application boundary.
pub type AppResult<T> = Result<T, AppError>;
