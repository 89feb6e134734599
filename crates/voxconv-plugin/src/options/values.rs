//! Raw staged input and coerced option values.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use voxconv_core::error::AppError;

/// A `key=value` assignment could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    /// No `=` in the assignment.
    #[error("Expected key=value, got '{0}'")]
    MissingEquals(String),

    /// Nothing before the `=`.
    #[error("Empty key in '{0}'")]
    EmptyKey(String),
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Raw, possibly incomplete option input keyed by field name.
///
/// Values are whatever a form produced: strings, numbers, booleans or
/// nested mappings. Nothing is validated until [`super::coerce`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagedOptions(BTreeMap<String, Value>);

impl StagedOptions {
    /// Empty staging area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Self::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Drops everything staged.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Staged keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Staged entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses `key=value` assignments; values stay raw strings.
    ///
    /// Dotted keys (`padding.after=10`) are staged as nested mappings.
    pub fn from_assignments<'a>(
        assignments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AssignmentError> {
        let mut staged = Self::new();
        for assignment in assignments {
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| AssignmentError::MissingEquals(assignment.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(AssignmentError::EmptyKey(assignment.to_string()));
            }
            staged.set_path(key, Value::String(value.to_string()));
        }
        Ok(staged)
    }

    fn set_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.0.insert((*head).to_string(), value);
            return;
        }

        let entry = self
            .0
            .entry((*head).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = entry {
            insert_nested(map, rest, value);
        }
    }
}

fn insert_nested(map: &mut serde_json::Map<String, Value>, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert((*head).to_string(), value);
        return;
    }
    let child = map
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !child.is_object() {
        *child = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(child_map) = child {
        insert_nested(child_map, rest, value);
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StagedOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Complete, validated option values in schema order.
///
/// Every schema field is present, normalized to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionValues {
    entries: Vec<(String, Value)>,
}

impl OptionValues {
    pub(crate) fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    /// Value of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schema had no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The values as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect())
    }

    /// Materializes the plugin's option struct.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assignments_are_raw_strings() {
        let staged = StagedOptions::from_assignments(["sample_rate=48000", "lyrics=no"]).unwrap();
        assert_eq!(staged.get("sample_rate"), Some(&json!("48000")));
        assert_eq!(staged.get("lyrics"), Some(&json!("no")));
    }

    #[test]
    fn test_dotted_assignment_nests() {
        let staged =
            StagedOptions::from_assignments(["padding.after=10", "padding.before=5"]).unwrap();
        assert_eq!(
            staged.get("padding"),
            Some(&json!({"after": "10", "before": "5"}))
        );
    }

    #[test]
    fn test_assignment_without_equals_fails() {
        assert_eq!(
            StagedOptions::from_assignments(["oops"]),
            Err(AssignmentError::MissingEquals("oops".to_string()))
        );
        assert_eq!(
            StagedOptions::from_assignments([" =1"]),
            Err(AssignmentError::EmptyKey(" =1".to_string()))
        );
    }

    #[test]
    fn test_value_after_equals_may_contain_equals() {
        let staged = StagedOptions::from_assignments(["lyric=a=b"]).unwrap();
        assert_eq!(staged.get("lyric"), Some(&json!("a=b")));
    }
}
