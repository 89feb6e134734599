//! Workspace errors.

use thiserror::Error;
use voxconv_core::error::{AppError, ErrorKind};

/// Errors raised by [`crate::VirtualWorkspace`].
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// No entry under this name.
    #[error("File '{name}' does not exist in the workspace")]
    NotFound {
        /// The requested name.
        name: String,
    },

    /// Building an archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Writing archive bytes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WorkspaceError> for AppError {
    fn from(err: WorkspaceError) -> Self {
        if matches!(err, WorkspaceError::NotFound { .. }) {
            return AppError::not_found(err.to_string());
        }
        let message = err.to_string();
        AppError::with_source(ErrorKind::Storage, message, err)
    }
}
