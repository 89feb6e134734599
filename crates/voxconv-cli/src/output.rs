//! Terminal rendering of registry tables, schemas, conversion results and
//! settings.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use voxconv_plugin::ConversionWarning;

/// How command results are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned tables and `key: value` lines
    #[default]
    Table,
    /// Pretty JSON, for scripts and form renderers
    Json,
}

/// Print rows as a table, or as a JSON array.
///
/// `empty` replaces an empty table; JSON output prints `[]` instead.
pub fn print_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat, empty: &str) {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("{empty}"),
        OutputFormat::Table => {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        OutputFormat::Json => print_json(rows),
    }
}

/// Print a settings value as dotted `key: value` lines, or as JSON.
pub fn print_settings<T: Serialize>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            for (key, text) in settings_lines(&value) {
                print_kv(&key, &text);
            }
        }
        OutputFormat::Json => print_json(value),
    }
}

/// Print any value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

/// Print conversion warnings to stderr, one per line
pub fn print_warnings<'a>(warnings: impl IntoIterator<Item = &'a ConversionWarning>) {
    for warning in warnings {
        eprintln!("⚠ {warning}");
    }
}

/// Report a file written to disk
pub fn print_written(path: &Path, size: usize) {
    print_success(&format!("Wrote '{}' ({size} bytes)", path.display()));
}

/// Report how many files of a run converted
pub fn print_summary(converted: usize, failed: usize) {
    if failed == 0 {
        print_success(&format!("{converted} file(s) converted"));
    } else {
        print_error(&format!("{converted} file(s) converted, {failed} failed"));
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {:<28} {}", format!("{key}:"), value);
}

/// Leaves of `value` keyed by dotted path, in document order.
fn settings_lines(value: &Value) -> Vec<(String, String)> {
    let mut lines = Vec::new();
    collect_lines("", value, &mut lines);
    lines
}

fn collect_lines(prefix: &str, value: &Value, lines: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_lines(&path, child, lines);
            }
        }
        Value::String(text) => lines.push((prefix.to_string(), text.clone())),
        other => lines.push((prefix.to_string(), other.to_string())),
    }
}
