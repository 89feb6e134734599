//! Logging configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Logging and tracing configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[validate(custom(function = "validate_level"))]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[validate(custom(function = "validate_format"))]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn validate_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("unknown_log_level")),
    }
}

fn validate_format(format: &str) -> Result<(), ValidationError> {
    match format {
        "json" | "pretty" => Ok(()),
        _ => Err(ValidationError::new("unknown_log_format")),
    }
}
