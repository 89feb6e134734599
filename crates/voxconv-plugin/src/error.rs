//! Errors raised by plugins and by the plugin registry.

use thiserror::Error;
use voxconv_core::error::{AppError, ErrorKind};

use crate::registry::Direction;

/// Broad category of a plugin failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginErrorKind {
    /// The plugin does not implement the requested operation.
    Unsupported,
    /// The input bytes or project could not be interpreted.
    InvalidData,
    /// The coerced options could not be turned into the plugin's option struct.
    InvalidOptions,
    /// The plugin is not registered.
    NotFound,
    /// Anything else.
    Other,
}

/// Error returned by a plugin's `load`, `process` or `dump`.
///
/// Kept `Clone` (message only, no boxed source) so that a failed outcome
/// can be cached in the wizard state and shown again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PluginError {
    /// The category of failure.
    pub kind: PluginErrorKind,
    /// A human-readable message.
    pub message: String,
}

impl PluginError {
    /// Create a new plugin error.
    pub fn new(kind: PluginErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The plugin does not support `operation`.
    pub fn unsupported(operation: &str) -> Self {
        Self::new(
            PluginErrorKind::Unsupported,
            format!("Operation '{operation}' is not supported by this plugin"),
        )
    }

    /// The data handed to the plugin is malformed.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::InvalidData, message)
    }

    /// The option values could not be materialized.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::InvalidOptions, message)
    }

    /// The referenced plugin is not registered.
    pub fn not_found(id: &str) -> Self {
        Self::new(PluginErrorKind::NotFound, format!("'{id}' is not registered"))
    }

    /// Any other failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::Other, message)
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_data(format!("JSON error: {err}"))
    }
}

impl From<std::str::Utf8Error> for PluginError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::invalid_data(format!("Input is not valid UTF-8: {err}"))
    }
}

/// Errors raised by the plugin registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No plugin or middleware with this id.
    #[error("'{id}' is not registered")]
    NotFound {
        /// The requested id.
        id: String,
    },

    /// The plugin exists but cannot be used in this direction.
    #[error("'{id}' cannot be used as {direction} format")]
    WrongCapability {
        /// The requested id.
        id: String,
        /// The requested direction.
        direction: Direction,
    },

    /// An id was registered twice.
    #[error("'{id}' is already registered")]
    Duplicate {
        /// The duplicated id.
        id: String,
    },
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::NotFound { .. } => AppError::not_found(err.to_string()),
            RegistryError::WrongCapability { .. } => AppError::validation(err.to_string()),
            RegistryError::Duplicate { .. } => AppError::new(ErrorKind::Conflict, err.to_string()),
        }
    }
}
