//! Plugin and middleware listing commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use super::{Context, DirectionArg};
use crate::output;
use voxconv_core::error::AppError;
use voxconv_plugin::{Capabilities, MiddlewareDescriptor, PluginDescriptor, Translator};

/// Arguments for the plugins command
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Only list formats usable in this direction
    #[arg(short, long, value_enum)]
    pub direction: Option<DirectionArg>,
}

/// Format plugin display row
#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    /// Plugin ID
    id: String,
    /// File extension
    suffix: String,
    /// Display name
    name: String,
    /// Read/write support
    capabilities: String,
    /// Version
    version: String,
    /// Description
    description: String,
}

impl PluginRow {
    fn new(descriptor: &PluginDescriptor, translator: &dyn Translator) -> Self {
        Self {
            id: descriptor.id.clone(),
            suffix: format!(".{}", descriptor.suffix),
            name: translator.text(&descriptor.display_name),
            capabilities: capability_label(descriptor.capabilities).to_string(),
            version: descriptor.version.clone(),
            description: translator.text(&descriptor.description),
        }
    }
}

/// Middleware display row
#[derive(Debug, Serialize, Tabled)]
struct MiddlewareRow {
    /// Position in the default chain
    position: usize,
    /// Middleware ID
    id: String,
    /// Display name
    name: String,
    /// Description
    description: String,
}

impl MiddlewareRow {
    fn new(position: usize, descriptor: &MiddlewareDescriptor, translator: &dyn Translator) -> Self {
        Self {
            position,
            id: descriptor.id.clone(),
            name: translator.text(&descriptor.display_name),
            description: translator.text(&descriptor.description),
        }
    }
}

fn capability_label(capabilities: Capabilities) -> &'static str {
    match capabilities {
        Capabilities::ReadOnly => "read",
        Capabilities::WriteOnly => "write",
        Capabilities::ReadWrite => "read/write",
    }
}

/// Execute the plugins command
pub fn execute(args: &PluginsArgs, ctx: &Context) -> Result<(), AppError> {
    let translator = ctx.translator.as_ref();
    let rows: Vec<PluginRow> = match args.direction {
        Some(direction) => ctx
            .registry
            .plugins(direction.into())
            .map(|d| PluginRow::new(d, translator))
            .collect(),
        None => ctx
            .registry
            .all_plugins()
            .map(|d| PluginRow::new(d, translator))
            .collect(),
    };
    output::print_rows(&rows, ctx.format, "No format plugins match.");
    Ok(())
}

/// Execute the middleware command
pub fn execute_middleware(ctx: &Context) -> Result<(), AppError> {
    let translator = ctx.translator.as_ref();
    let rows: Vec<MiddlewareRow> = ctx
        .registry
        .all_middleware()
        .enumerate()
        .map(|(position, d)| MiddlewareRow::new(position, d, translator))
        .collect();
    output::print_rows(&rows, ctx.format, "No middleware registered.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::{Direction, IdentityTranslator, MessageCatalog};

    #[test]
    fn test_rows_follow_registration_order() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let rows: Vec<PluginRow> = registry
            .plugins(Direction::Output)
            .map(|d| PluginRow::new(d, &IdentityTranslator))
            .collect();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["json", "lrc"]);
        assert_eq!(rows[1].suffix, ".lrc");
        assert_eq!(rows[1].capabilities, "write");
    }

    #[test]
    fn test_middleware_rows_are_translated() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let catalog = MessageCatalog::from_pairs("zh_CN", [("Transpose", "移调")]);
        let rows: Vec<MiddlewareRow> = registry
            .all_middleware()
            .enumerate()
            .map(|(position, d)| MiddlewareRow::new(position, d, &catalog))
            .collect();
        assert_eq!(rows[0].name, "移调");
        assert_eq!(rows[1].position, 1);
        assert_eq!(rows[1].id, "normalize_tempo");
    }
}
