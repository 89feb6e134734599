//! Conversion pipeline configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How the pipeline names the file it writes back into the workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// `<input stem>.<output suffix>`
    #[default]
    Stem,
    /// `<fixed_name>.<output suffix>`
    Fixed,
}

/// Conversion pipeline settings.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Output naming policy.
    pub naming: OutputNaming,
    /// Base name used by [`OutputNaming::Fixed`].
    #[validate(length(min = 1, max = 128))]
    pub fixed_name: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            naming: OutputNaming::default(),
            fixed_name: default_fixed_name(),
        }
    }
}

fn default_fixed_name() -> String {
    "export".to_string()
}

impl ConversionConfig {
    /// Derive the output file name for `input_name` converted to `suffix`.
    ///
    /// Only the last extension of the input is stripped, and a leading dot
    /// (hidden file) is not treated as an extension separator.
    pub fn output_file_name(&self, input_name: &str, suffix: &str) -> String {
        let base = match self.naming {
            OutputNaming::Stem => file_stem(input_name),
            OutputNaming::Fixed => self.fixed_name.as_str(),
        };
        format!("{base}.{suffix}")
    }
}

/// Strip the last extension from a flat file name.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
