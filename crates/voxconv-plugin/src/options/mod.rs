//! Option schemas declared explicitly by plugins.
//!
//! Each plugin operation names its option struct through [`OptionType`].
//! The struct implements [`OptionSet`], which builds an [`OptionSchema`]
//! from a static field declaration plus the struct's own `Default` value,
//! so the declared defaults can never drift from `T::default()`.

mod coerce;
mod schema;
mod values;

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{EnumMessage, VariantArray};

pub use coerce::{OptionValidationError, coerce, coerce_typed};
pub use values::{AssignmentError, OptionValues, StagedOptions};

/// Type tag of a single option field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// `true` / `false`.
    Bool,
    /// Whole number with optional inclusive bounds.
    Integer {
        /// Lower bound.
        minimum: Option<i64>,
        /// Upper bound.
        maximum: Option<i64>,
    },
    /// Finite floating point number with optional inclusive bounds.
    Float {
        /// Lower bound.
        minimum: Option<f64>,
        /// Upper bound.
        maximum: Option<f64>,
    },
    /// Free text.
    String,
    /// `#rrggbb` color.
    Color,
    /// One of a fixed, ordered set of values.
    Enum {
        /// Allowed values in declaration order.
        choices: Vec<EnumChoice>,
    },
    /// Nested group of fields.
    Composite {
        /// The nested fields.
        fields: Vec<OptionField>,
    },
}

impl FieldKind {
    /// Short name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "number",
            Self::String => "string",
            Self::Color => "color",
            Self::Enum { .. } => "enum",
            Self::Composite { .. } => "object",
        }
    }
}

/// One allowed value of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumChoice {
    /// Serialized value; this is what coercion accepts.
    pub value: String,
    /// Display label, if the enum declares one for this member.
    pub label: Option<String>,
}

/// One field of an option schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionField {
    /// Field key; unique within its schema.
    pub name: String,
    /// Type tag.
    pub kind: FieldKind,
    /// Default value, taken from the option struct's `Default`.
    pub default: Value,
    /// Display title.
    pub title: Option<String>,
    /// Longer help text.
    pub description: Option<String>,
}

/// Structural description of an option struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    /// Name of the declaring type.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<OptionField>,
}

impl OptionSchema {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&OptionField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// An option struct that declares its own schema.
pub trait OptionSet: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Builds the schema. Must be pure: same output on every call.
    fn schema() -> OptionSchema;

    /// Descriptor of this type.
    fn option_type() -> OptionType {
        OptionType::of::<Self>()
    }
}

/// Enumerations usable as option fields.
///
/// Blanket-implemented for `strum` enums deriving `VariantArray`,
/// `EnumMessage` and `AsRefStr`; `#[strum(message = "...")]` on a variant
/// becomes its label. Variants without a message are still listed.
pub trait OptionEnum {
    /// Choices in declaration order.
    fn choices() -> Vec<EnumChoice>;
}

impl<E> OptionEnum for E
where
    E: VariantArray + EnumMessage + AsRef<str> + 'static,
{
    fn choices() -> Vec<EnumChoice> {
        E::VARIANTS
            .iter()
            .map(|variant| EnumChoice {
                value: variant.as_ref().to_string(),
                label: variant.get_message().map(str::to_string),
            })
            .collect()
    }
}

/// Descriptor naming the option struct accepted by a plugin operation.
///
/// Registered alongside the operation instead of being discovered by
/// reflection.
#[derive(Clone, Copy)]
pub struct OptionType {
    type_name: &'static str,
    build: fn() -> OptionSchema,
}

impl OptionType {
    /// Descriptor for `T`.
    pub fn of<T: OptionSet>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            build: T::schema,
        }
    }

    /// Fully qualified name of the option struct.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for OptionType {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for OptionType {}

/// Derives the schema for an option type.
pub fn schema_for(option_type: &OptionType) -> OptionSchema {
    (option_type.build)()
}

/// Option struct for operations that take no configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoOptions {}

impl OptionSet for NoOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("NoOptions").build()
    }
}

/// Builder used inside [`OptionSet::schema`] implementations.
///
/// ```ignore
/// SchemaBuilder::new::<Self>("LrcOutputOptions")
///     .integer("offset_ms", "Offset (ms)")
///     .range(-60_000, 60_000)
///     .enumeration::<SplitMode>("split_by", "Line break rule")
///     .build()
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    defaults: serde_json::Map<String, Value>,
    fields: Vec<OptionField>,
}

impl SchemaBuilder {
    /// Starts a schema for `T`, capturing `T::default()` as the default source.
    pub fn new<T: Default + Serialize>(name: &str) -> Self {
        let defaults = match serde_json::to_value(T::default()) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            name: name.to_string(),
            defaults,
            fields: Vec::new(),
        }
    }

    fn push(mut self, name: &str, kind: FieldKind, title: &str) -> Self {
        let default = self.defaults.get(name).cloned().unwrap_or(Value::Null);
        self.fields.push(OptionField {
            name: name.to_string(),
            kind,
            default,
            title: Some(title.to_string()),
            description: None,
        });
        self
    }

    /// Boolean field.
    pub fn boolean(self, name: &str, title: &str) -> Self {
        self.push(name, FieldKind::Bool, title)
    }

    /// Integer field; see [`Self::range`].
    pub fn integer(self, name: &str, title: &str) -> Self {
        self.push(
            name,
            FieldKind::Integer {
                minimum: None,
                maximum: None,
            },
            title,
        )
    }

    /// Float field; see [`Self::float_range`].
    pub fn float(self, name: &str, title: &str) -> Self {
        self.push(
            name,
            FieldKind::Float {
                minimum: None,
                maximum: None,
            },
            title,
        )
    }

    /// Text field.
    pub fn string(self, name: &str, title: &str) -> Self {
        self.push(name, FieldKind::String, title)
    }

    /// Color field.
    pub fn color(self, name: &str, title: &str) -> Self {
        self.push(name, FieldKind::Color, title)
    }

    /// Enumerated field backed by `E`.
    pub fn enumeration<E: OptionEnum>(self, name: &str, title: &str) -> Self {
        self.push(
            name,
            FieldKind::Enum {
                choices: E::choices(),
            },
            title,
        )
    }

    /// Nested field group backed by `C`.
    pub fn composite<C: OptionSet>(self, name: &str, title: &str) -> Self {
        let mut fields = C::schema().fields;
        if let Some(Value::Object(outer)) = self.defaults.get(name) {
            for field in &mut fields {
                if let Some(value) = outer.get(&field.name) {
                    field.default = value.clone();
                }
            }
        }
        self.push(name, FieldKind::Composite { fields }, title)
    }

    /// Sets the description of the last added field.
    pub fn describe(mut self, description: &str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.description = Some(description.to_string());
        }
        self
    }

    /// Bounds the last added integer field.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        if let Some(OptionField {
            kind: FieldKind::Integer { minimum, maximum },
            ..
        }) = self.fields.last_mut()
        {
            *minimum = Some(min);
            *maximum = Some(max);
        }
        self
    }

    /// Bounds the last added float field.
    pub fn float_range(mut self, min: f64, max: f64) -> Self {
        if let Some(OptionField {
            kind: FieldKind::Float { minimum, maximum },
            ..
        }) = self.fields.last_mut()
        {
            *minimum = Some(min);
            *maximum = Some(max);
        }
        self
    }

    /// Finishes the schema.
    ///
    /// # Panics
    ///
    /// Panics if two fields share a name. Schemas are static declarations,
    /// so this surfaces on the first call in any test touching the plugin.
    pub fn build(self) -> OptionSchema {
        let mut seen = HashSet::new();
        for field in &self.fields {
            assert!(
                seen.insert(field.name.as_str()),
                "duplicate option field '{}' in {}",
                field.name,
                self.name
            );
        }
        OptionSchema {
            name: self.name,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use strum::{AsRefStr, EnumMessage, VariantArray};

    #[derive(
        Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumMessage,
        VariantArray,
    )]
    #[serde(rename_all = "snake_case")]
    #[strum(serialize_all = "snake_case")]
    pub enum Quantize {
        #[strum(message = "Sixteenth notes")]
        #[default]
        Sixteenth,
        #[strum(message = "Eighth notes")]
        Eighth,
        Off,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Padding {
        pub before: i64,
        pub after: i64,
    }

    impl Default for Padding {
        fn default() -> Self {
            Self {
                before: 0,
                after: 240,
            }
        }
    }

    impl OptionSet for Padding {
        fn schema() -> OptionSchema {
            SchemaBuilder::new::<Self>("Padding")
                .integer("before", "Before")
                .integer("after", "After")
                .build()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SampleOptions {
        pub sample_rate: i64,
        pub gain: f64,
        pub lyrics: bool,
        pub singer: String,
        pub accent: String,
        pub quantize: Quantize,
        pub padding: Padding,
    }

    impl Default for SampleOptions {
        fn default() -> Self {
            Self {
                sample_rate: 44100,
                gain: 0.0,
                lyrics: true,
                singer: "default".to_string(),
                accent: "#ff8800".to_string(),
                quantize: Quantize::Sixteenth,
                padding: Padding::default(),
            }
        }
    }

    impl OptionSet for SampleOptions {
        fn schema() -> OptionSchema {
            SchemaBuilder::new::<Self>("SampleOptions")
                .integer("sample_rate", "Sample rate")
                .range(8000, 192000)
                .float("gain", "Gain (dB)")
                .float_range(-24.0, 24.0)
                .describe("Applied to every rendered track")
                .boolean("lyrics", "Import lyrics")
                .string("singer", "Default singer")
                .color("accent", "Track color")
                .enumeration::<Quantize>("quantize", "Quantization")
                .composite::<Padding>("padding", "Padding")
                .build()
        }
    }
}
