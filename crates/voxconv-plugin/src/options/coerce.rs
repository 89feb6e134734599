//! Coercion of raw staged input into complete option values.

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use super::values::{OptionValues, StagedOptions};
use super::{FieldKind, OptionField, OptionSet, OptionType, schema_for};

/// A staged value could not be converted to its field's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value for option '{field}': {reason}")]
pub struct OptionValidationError {
    /// Offending field; nested fields use a dotted path.
    pub field: String,
    /// What went wrong.
    pub reason: String,
}

impl OptionValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Coerces `raw` against the schema of `option_type`.
///
/// Absent (or `null`) fields take their declared default. A present value
/// that cannot be converted fails with the field's name. Unknown keys are
/// ignored. Nothing outside the returned value is touched.
pub fn coerce(
    option_type: &OptionType,
    raw: &StagedOptions,
) -> Result<OptionValues, OptionValidationError> {
    let schema = schema_for(option_type);
    for key in raw.keys() {
        if schema.field(key).is_none() {
            debug!(option_type = option_type.type_name(), key, "Ignoring unknown option");
        }
    }
    let entries = coerce_fields(&schema.fields, |name| raw.get(name), "")?;
    Ok(OptionValues::new(entries))
}

/// Coerces `raw` straight into the option struct `T`.
pub fn coerce_typed<T: OptionSet>(raw: &StagedOptions) -> Result<T, OptionValidationError> {
    let values = coerce(&OptionType::of::<T>(), raw)?;
    values
        .to_typed()
        .map_err(|e| OptionValidationError::new("*", e.to_string()))
}

fn coerce_fields<'a>(
    fields: &[OptionField],
    lookup: impl Fn(&str) -> Option<&'a Value>,
    prefix: &str,
) -> Result<Vec<(String, Value)>, OptionValidationError> {
    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        let value = match lookup(&field.name) {
            None | Some(Value::Null) => field.default.clone(),
            Some(raw) => coerce_value(field, raw, &path)?,
        };
        entries.push((field.name.clone(), value));
    }
    Ok(entries)
}

fn coerce_value(field: &OptionField, raw: &Value, path: &str) -> Result<Value, OptionValidationError> {
    let mismatch = || {
        OptionValidationError::new(
            path,
            format!("expected {}, got {}", field.kind.type_name(), describe(raw)),
        )
    };

    match &field.kind {
        FieldKind::Bool => to_bool(raw).map(Value::Bool).ok_or_else(mismatch),
        FieldKind::Integer { minimum, maximum } => {
            let n = to_integer(raw).ok_or_else(mismatch)?;
            if minimum.is_some_and(|min| n < min) || maximum.is_some_and(|max| n > max) {
                return Err(OptionValidationError::new(
                    path,
                    format!("{n} is outside {}", bounds(minimum, maximum)),
                ));
            }
            Ok(Value::from(n))
        }
        FieldKind::Float { minimum, maximum } => {
            let n = to_float(raw).ok_or_else(mismatch)?;
            if minimum.is_some_and(|min| n < min) || maximum.is_some_and(|max| n > max) {
                return Err(OptionValidationError::new(
                    path,
                    format!("{n} is outside {}", bounds(minimum, maximum)),
                ));
            }
            Number::from_f64(n).map(Value::Number).ok_or_else(mismatch)
        }
        FieldKind::String => match raw {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        FieldKind::Color => raw
            .as_str()
            .and_then(normalize_color)
            .map(Value::String)
            .ok_or_else(mismatch),
        FieldKind::Enum { choices } => {
            let text = raw.as_str().map(str::trim).ok_or_else(mismatch)?;
            choices
                .iter()
                .find(|c| c.value == text)
                .or_else(|| choices.iter().find(|c| c.value.eq_ignore_ascii_case(text)))
                .map(|c| Value::String(c.value.clone()))
                .ok_or_else(|| {
                    let allowed: Vec<&str> = choices.iter().map(|c| c.value.as_str()).collect();
                    OptionValidationError::new(
                        path,
                        format!("'{text}' is not one of [{}]", allowed.join(", ")),
                    )
                })
        }
        FieldKind::Composite { fields } => {
            let parsed;
            let map: &Map<String, Value> = match raw {
                Value::Object(map) => map,
                Value::String(s) => {
                    parsed = serde_json::from_str::<Value>(s).map_err(|_| mismatch())?;
                    parsed.as_object().ok_or_else(mismatch)?
                }
                _ => return Err(mismatch()),
            };
            let entries = coerce_fields(fields, |name| map.get(name), path)?;
            Ok(Value::Object(entries.into_iter().collect()))
        }
    }
}

fn to_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn normalize_color(text: &str) -> Option<String> {
    let hex = text.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let full = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return None,
    };
    Some(format!("#{}", full.to_ascii_lowercase()))
}

fn bounds<T: std::fmt::Display>(minimum: &Option<T>, maximum: &Option<T>) -> String {
    match (minimum, maximum) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!("[{min}, ..)"),
        (None, Some(max)) => format!("(.., {max}]"),
        (None, None) => "(.., ..)".to_string(),
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::String(s) => format!("'{s}'"),
        Value::Object(_) => "a mapping".to_string(),
        Value::Array(_) => "a list".to_string(),
        other => other.to_string(),
    }
}
