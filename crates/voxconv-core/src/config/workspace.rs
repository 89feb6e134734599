//! Virtual workspace configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Limits applied to the per-session in-memory workspace.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Largest accepted upload in bytes.
    #[validate(range(min = 1))]
    pub max_upload_bytes: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> u64 {
    64 * 1024 * 1024
}
