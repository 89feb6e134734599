//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use voxconv_core::config::OutputNaming;
use voxconv_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate configuration file and environment
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let source = config_path.unwrap_or("<defaults>");
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            output::print_settings(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", source));
                output::print_kv(
                    "Logging",
                    &format!("{} ({})", config.logging.level, config.logging.format),
                );
                output::print_kv(
                    "Max upload",
                    &format!("{} bytes", config.workspace.max_upload_bytes),
                );
                let naming = match config.conversion.naming {
                    OutputNaming::Stem => "input stem".to_string(),
                    OutputNaming::Fixed => format!("fixed '{}'", config.conversion.fixed_name),
                };
                output::print_kv("Output naming", &naming);
                output::print_kv(
                    "Language",
                    &format!(
                        "{} (catalogs in {})",
                        config.i18n.default_language, config.i18n.catalog_dir
                    ),
                );
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(command: ConfigCommand) -> ConfigArgs {
        ConfigArgs { command }
    }

    #[tokio::test]
    async fn test_validate_accepts_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[conversion]\nnaming = \"fixed\"\nfixed_name = \"out\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        execute(&args(ConfigCommand::Validate), Some(&path), OutputFormat::Json)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_level() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nlevel = \"loud\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let err = execute(&args(ConfigCommand::Validate), Some(&path), OutputFormat::Table)
            .await
            .unwrap_err();
        assert_eq!(err.kind, voxconv_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_show_without_file_uses_defaults() {
        execute(&args(ConfigCommand::Show), None, OutputFormat::Json)
            .await
            .unwrap();
    }
}
