//! Translation of display text in option schemas.
//!
//! Only titles, descriptions and enum labels pass through a translator.
//! Field names, enum values, defaults and ordering are never touched.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::options::{FieldKind, OptionField, OptionSchema};

/// Message lookup. `None` means "no translation"; callers fall back to the
/// source text.
pub trait Translator: Send + Sync {
    /// Translation of `message`, if one exists.
    fn translate(&self, message: &str) -> Option<String>;

    /// Translation of `message`, or `message` itself.
    fn text(&self, message: &str) -> String {
        self.translate(message)
            .unwrap_or_else(|| message.to_string())
    }
}

impl<F> Translator for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn translate(&self, message: &str) -> Option<String> {
        self(message)
    }
}

/// Translator that never translates.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, _message: &str) -> Option<String> {
        None
    }
}

/// Failure loading a message catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("Cannot read catalog {path}: {source}")]
    Io {
        /// Catalog path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The catalog file is not a JSON string map.
    #[error("Malformed catalog {path}: {source}")]
    Parse {
        /// Catalog path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// A flat source-text → translation map for one language.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageCatalog {
    /// Language tag, e.g. `zh_CN`.
    #[serde(default)]
    pub language: String,
    /// Translations keyed by source text.
    pub messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Builds a catalog from pairs.
    pub fn from_pairs<'a>(
        language: &str,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            language: language.to_string(),
            messages: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Loads `<dir>/<language>.json`.
    pub fn load(dir: impl AsRef<Path>, language: &str) -> Result<Self, CatalogError> {
        let path = dir.as_ref().join(format!("{language}.json"));
        let path_text = path.display().to_string();
        let text = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path_text.clone(),
            source,
        })?;
        let mut catalog: Self = serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: path_text.clone(),
            source,
        })?;
        if catalog.language.is_empty() {
            catalog.language = language.to_string();
        }
        debug!(path = %path_text, entries = catalog.messages.len(), "Message catalog loaded");
        Ok(catalog)
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, message: &str) -> Option<String> {
        self.messages.get(message).cloned()
    }
}

/// Returns `schema` with every title, description and enum label translated.
pub fn localize_schema(schema: &OptionSchema, translator: &dyn Translator) -> OptionSchema {
    OptionSchema {
        name: schema.name.clone(),
        fields: localize_fields(&schema.fields, translator),
    }
}

fn localize_fields(fields: &[OptionField], translator: &dyn Translator) -> Vec<OptionField> {
    fields
        .iter()
        .map(|field| OptionField {
            name: field.name.clone(),
            kind: localize_kind(&field.kind, translator),
            default: field.default.clone(),
            title: field.title.as_deref().map(|t| translator.text(t)),
            description: field.description.as_deref().map(|d| translator.text(d)),
        })
        .collect()
}

fn localize_kind(kind: &FieldKind, translator: &dyn Translator) -> FieldKind {
    match kind {
        FieldKind::Enum { choices } => FieldKind::Enum {
            choices: choices
                .iter()
                .map(|choice| crate::options::EnumChoice {
                    value: choice.value.clone(),
                    label: choice.label.as_deref().map(|l| translator.text(l)),
                })
                .collect(),
        },
        FieldKind::Composite { fields } => FieldKind::Composite {
            fields: localize_fields(fields, translator),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSet;
    use crate::options::test_support::*;
    use std::io::Write;

    fn catalog() -> MessageCatalog {
        MessageCatalog::from_pairs(
            "zh_CN",
            [
                ("Sample rate", "采样率"),
                ("Sixteenth notes", "十六分音符"),
                ("After", "之后"),
                ("Applied to every rendered track", "应用于所有轨道"),
            ],
        )
    }

    #[test]
    fn test_titles_translated_keys_untouched() {
        let schema = SampleOptions::schema();
        let localized = localize_schema(&schema, &catalog());

        assert_eq!(localized.field_names(), schema.field_names());
        assert_eq!(localized.fields[0].title.as_deref(), Some("采样率"));
        assert_eq!(
            localized.fields[1].description.as_deref(),
            Some("应用于所有轨道")
        );
        // untranslated text falls back to the source string
        assert_eq!(localized.fields[2].title.as_deref(), Some("Import lyrics"));

        let FieldKind::Enum { choices } = &localized.field("quantize").unwrap().kind else {
            panic!("quantize should be an enum");
        };
        assert_eq!(choices[0].value, "sixteenth");
        assert_eq!(choices[0].label.as_deref(), Some("十六分音符"));
        assert_eq!(choices[2].label, None);

        let FieldKind::Composite { fields } = &localized.field("padding").unwrap().kind else {
            panic!("padding should be composite");
        };
        assert_eq!(fields[1].name, "after");
        assert_eq!(fields[1].title.as_deref(), Some("之后"));
    }

    #[test]
    fn test_localizing_twice_keeps_keys_and_defaults() {
        let schema = SampleOptions::schema();
        let once = localize_schema(&schema, &catalog());
        let twice = localize_schema(&once, &catalog());
        assert_eq!(twice.field_names(), schema.field_names());
        for (a, b) in schema.fields.iter().zip(&twice.fields) {
            assert_eq!(a.default, b.default);
        }
    }

    #[test]
    fn test_identity_and_closure_translators() {
        assert_eq!(IdentityTranslator.text("Convert"), "Convert");
        let upper = |m: &str| Some(m.to_uppercase());
        assert_eq!(upper.text("convert"), "CONVERT");
    }

    #[test]
    fn test_load_catalog_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ja_JP.json")).unwrap();
        write!(file, r#"{{"messages": {{"Convert": "変換"}}}}"#).unwrap();

        let catalog = MessageCatalog::load(dir.path(), "ja_JP").unwrap();
        assert_eq!(catalog.language, "ja_JP");
        assert_eq!(catalog.text("Convert"), "変換");
        assert!(MessageCatalog::load(dir.path(), "fr_FR").is_err());
    }
}
