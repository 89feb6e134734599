//! Localization configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Where message catalogs live and which language is used by default.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Language tag used when none is requested, e.g. `en_US`.
    #[validate(length(min = 2))]
    pub default_language: String,
    /// Directory holding `<lang>.json` catalogs.
    pub catalog_dir: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: "en_US".to_string(),
            catalog_dir: "./locales".to_string(),
        }
    }
}
