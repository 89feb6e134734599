//! Option schema introspection command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use super::{Context, DirectionArg};
use crate::output::{self, OutputFormat};
use voxconv_core::error::AppError;
use voxconv_plugin::{
    Direction, FieldKind, OptionField, OptionSchema, PluginRegistry, RegistryError,
    localize_schema, schema_for,
};

/// Arguments for the schema command
#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Plugin or middleware ID
    pub id: String,

    /// Which option set of a format plugin to show; defaults to input when
    /// the plugin can read
    #[arg(short, long, value_enum, conflicts_with = "middleware")]
    pub direction: Option<DirectionArg>,

    /// Treat `id` as a middleware ID
    #[arg(short, long)]
    pub middleware: bool,
}

/// Schema field display row
#[derive(Debug, Serialize, Tabled)]
struct FieldRow {
    /// Field key, dotted for nested fields
    name: String,
    /// Value type
    #[tabled(rename = "type")]
    kind: String,
    /// Default value
    default: String,
    /// Accepted values or bounds
    accepts: String,
    /// Title
    title: String,
}

/// Execute the schema command
pub fn execute(args: &SchemaArgs, ctx: &Context) -> Result<(), AppError> {
    let schema = resolve_schema(&ctx.registry, args)?;
    let schema = localize_schema(&schema, ctx.translator.as_ref());

    match ctx.format {
        OutputFormat::Json => output::print_json(&schema.to_json_schema()),
        OutputFormat::Table => {
            let mut rows = Vec::new();
            collect_rows(&schema.fields, "", &mut rows);
            output::print_rows(&rows, ctx.format, "This option set has no fields.");
        }
    }
    Ok(())
}

fn resolve_schema(registry: &PluginRegistry, args: &SchemaArgs) -> Result<OptionSchema, AppError> {
    if args.middleware {
        let middleware = registry.middleware(&args.id)?;
        return Ok(schema_for(&middleware.descriptor().process_option_type));
    }

    let descriptor = registry.get(&args.id)?;
    let direction = match args.direction {
        Some(direction) => direction.into(),
        None if descriptor.capabilities.can_read() => Direction::Input,
        None => Direction::Output,
    };
    let option_type =
        descriptor
            .option_type(direction)
            .ok_or_else(|| RegistryError::WrongCapability {
                id: args.id.clone(),
                direction,
            })?;
    Ok(schema_for(&option_type))
}

fn collect_rows(fields: &[OptionField], prefix: &str, rows: &mut Vec<FieldRow>) {
    for field in fields {
        let name = format!("{prefix}{}", field.name);
        if let FieldKind::Composite { fields } = &field.kind {
            collect_rows(fields, &format!("{name}."), rows);
            continue;
        }
        rows.push(FieldRow {
            kind: field.kind.type_name().to_string(),
            default: field.default.to_string(),
            accepts: accepted_values(&field.kind),
            title: field.title.clone().unwrap_or_default(),
            name,
        });
    }
}

fn accepted_values(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Integer { minimum, maximum } => {
            bounds(minimum.map(|v| v.to_string()), maximum.map(|v| v.to_string()))
        }
        FieldKind::Float { minimum, maximum } => {
            bounds(minimum.map(|v| v.to_string()), maximum.map(|v| v.to_string()))
        }
        FieldKind::Enum { choices } => choices
            .iter()
            .map(|c| match &c.label {
                Some(label) => format!("{} ({label})", c.value),
                None => c.value.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        FieldKind::Color => "#rrggbb".to_string(),
        _ => String::new(),
    }
}

fn bounds(minimum: Option<String>, maximum: Option<String>) -> String {
    match (minimum, maximum) {
        (Some(min), Some(max)) => format!("{min}..={max}"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(id: &str, direction: Option<DirectionArg>, middleware: bool) -> SchemaArgs {
        SchemaArgs {
            id: id.to_string(),
            direction,
            middleware,
        }
    }

    #[test]
    fn test_default_direction_follows_capabilities() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();

        let json = resolve_schema(&registry, &args("json", None, false)).unwrap();
        assert_eq!(json.name, "JsonInputOptions");
        let lrc = resolve_schema(&registry, &args("lrc", None, false)).unwrap();
        assert_eq!(lrc.name, "LrcOptions");
    }

    #[test]
    fn test_unsupported_direction_is_rejected() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let err =
            resolve_schema(&registry, &args("lrc", Some(DirectionArg::Input), false)).unwrap_err();
        assert!(err.message.contains("lrc"));
    }

    #[test]
    fn test_middleware_schema_rows() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let schema = resolve_schema(&registry, &args("transpose_key", None, true)).unwrap();
        let mut rows = Vec::new();
        collect_rows(&schema.fields, "", &mut rows);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "semitones");
        assert_eq!(rows[0].kind, "integer");
        assert_eq!(rows[0].default, "0");
        assert_eq!(rows[0].accepts, "-24..=24");
    }

    #[test]
    fn test_enum_choices_are_listed_in_order() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let schema = resolve_schema(&registry, &args("lrc", None, false)).unwrap();
        let mut rows = Vec::new();
        collect_rows(&schema.fields, "", &mut rows);

        let split = rows.iter().find(|r| r.name == "split_by").unwrap();
        assert_eq!(split.default, "\"both\"");
        assert!(split.accepts.starts_with("both (Punctuation and bar lines), symbol"));
    }

    #[test]
    fn test_unknown_middleware() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let err = resolve_schema(&registry, &args("json", None, true)).unwrap_err();
        assert_eq!(err.kind, voxconv_core::error::ErrorKind::NotFound);
    }
}
