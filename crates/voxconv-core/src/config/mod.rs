//! Application configuration schemas.
//!
//! Configuration is deserialized via the `config` crate from an optional
//! TOML file and `VOXCONV__*` environment variables. Every section carries
//! serde defaults, so an empty source yields a usable configuration.

pub mod conversion;
pub mod i18n;
pub mod logging;
pub mod workspace;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::conversion::{ConversionConfig, OutputNaming};
pub use self::i18n::I18nConfig;
pub use self::logging::LoggingConfig;
pub use self::workspace::WorkspaceConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings.
    #[validate(nested)]
    pub logging: LoggingConfig,
    /// Workspace limits.
    #[validate(nested)]
    pub workspace: WorkspaceConfig,
    /// Pipeline settings.
    #[validate(nested)]
    pub conversion: ConversionConfig,
    /// Localization settings.
    #[validate(nested)]
    pub i18n: I18nConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus the environment.
    ///
    /// A missing file is not an error; the defaults apply. The result is
    /// validated before it is returned.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("VOXCONV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        tracing::debug!(
            naming = ?app.conversion.naming,
            language = %app.i18n.default_language,
            "Configuration loaded"
        );
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::conversion::OutputNaming;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conversion.naming, OutputNaming::Stem);
        assert_eq!(config.conversion.fixed_name, "export");
        assert_eq!(config.i18n.default_language, "en_US");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "[conversion]\nnaming = \"fixed\"\nfixed_name = \"out\"\n\n[logging]\nlevel = \"debug\""
        )
        .expect("write");

        let path = file.path().to_str().expect("utf8 path");
        let config = AppConfig::load(Some(path)).expect("load");
        assert_eq!(config.conversion.naming, OutputNaming::Fixed);
        assert_eq!(config.conversion.fixed_name, "out");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some("/nonexistent/voxconv.toml")).expect("load");
        assert_eq!(config.workspace.max_upload_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
