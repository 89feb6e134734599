//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod plugins;
pub mod schema;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};

use crate::output::OutputFormat;
use voxconv_core::config::{AppConfig, I18nConfig};
use voxconv_core::error::AppError;
use voxconv_plugin::{Direction, IdentityTranslator, MessageCatalog, PluginRegistry, Translator};

/// voxconv: convert singing voice synthesis projects between formats
#[derive(Debug, Parser)]
#[command(name = "voxconv", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Language of schema titles and messages, e.g. `zh_CN`
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List format plugins
    Plugins(plugins::PluginsArgs),
    /// List middleware in default application order
    Middleware,
    /// Print the option schema of a plugin
    Schema(schema::SchemaArgs),
    /// Convert project files
    Convert(convert::ConvertArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Plugins(args) => plugins::execute(args, &self.context()?),
            Commands::Middleware => plugins::execute_middleware(&self.context()?),
            Commands::Schema(args) => schema::execute(args, &self.context()?),
            Commands::Convert(args) => convert::execute(args, &self.context()?).await,
            Commands::Config(args) => {
                config::execute(args, self.config.as_deref(), self.format).await
            }
        }
    }

    fn context(&self) -> Result<Context, AppError> {
        let config = load_config(self.config.as_deref())?;
        let registry = plugin_builtin_formats::builtin_registry()?;
        let translator = load_translator(&config.i18n, self.lang.as_deref());
        Ok(Context {
            config,
            registry: Arc::new(registry),
            translator,
            format: self.format,
        })
    }
}

/// Everything a command needs once configuration is loaded.
pub struct Context {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Registry of built-in plugins.
    pub registry: Arc<PluginRegistry>,
    /// Translator for the requested language.
    pub translator: Box<dyn Translator>,
    /// Selected output format.
    pub format: OutputFormat,
}

/// `--direction` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Formats that can be read
    Input,
    /// Formats that can be written
    Output,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Input => Direction::Input,
            DirectionArg::Output => Direction::Output,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Catalog for `requested` (or the configured default language).
///
/// A missing or malformed catalog falls back to the untranslated text.
pub fn load_translator(i18n: &I18nConfig, requested: Option<&str>) -> Box<dyn Translator> {
    let language = requested.unwrap_or(i18n.default_language.as_str());
    match MessageCatalog::load(&i18n.catalog_dir, language) {
        Ok(catalog) => Box::new(catalog),
        Err(e) => {
            if requested.is_some() {
                warn!(language, error = %e, "No usable message catalog, using source text");
            } else {
                debug!(language, error = %e, "No message catalog for default language");
            }
            Box::new(IdentityTranslator)
        }
    }
}
