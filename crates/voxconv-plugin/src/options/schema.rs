//! JSON Schema rendering for dynamic form generation.

use serde_json::{Map, Value, json};

use super::{FieldKind, OptionField, OptionSchema};

impl OptionSchema {
    /// Renders the schema as a JSON Schema object.
    ///
    /// `properties` is a map, so field order is carried separately in
    /// `propertyOrder` for form renderers.
    pub fn to_json_schema(&self) -> Value {
        let mut root = object_schema(&self.fields);
        if let Value::Object(map) = &mut root {
            map.insert("title".to_string(), Value::String(self.name.clone()));
        }
        root
    }
}

fn object_schema(fields: &[OptionField]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|field| (field.name.clone(), field_schema(field)))
        .collect();
    let order: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    json!({
        "type": "object",
        "properties": properties,
        "propertyOrder": order,
    })
}

fn field_schema(field: &OptionField) -> Value {
    let mut schema = match &field.kind {
        FieldKind::Bool => json!({ "type": "boolean" }),
        FieldKind::Integer { minimum, maximum } => {
            let mut s = json!({ "type": "integer" });
            insert_bounds(&mut s, minimum.map(Value::from), maximum.map(Value::from));
            s
        }
        FieldKind::Float { minimum, maximum } => {
            let mut s = json!({ "type": "number" });
            insert_bounds(&mut s, minimum.map(Value::from), maximum.map(Value::from));
            s
        }
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Color => json!({ "type": "string", "format": "color" }),
        FieldKind::Enum { choices } => {
            let one_of: Vec<Value> = choices
                .iter()
                .map(|choice| match &choice.label {
                    Some(label) => json!({ "const": choice.value, "title": label }),
                    None => json!({ "const": choice.value }),
                })
                .collect();
            json!({ "type": "string", "oneOf": one_of })
        }
        FieldKind::Composite { fields } => object_schema(fields),
    };

    if let Value::Object(map) = &mut schema {
        if let Some(title) = &field.title {
            map.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(description) = &field.description {
            map.insert("description".to_string(), Value::String(description.clone()));
        }
        if !field.default.is_null() {
            map.insert("default".to_string(), field.default.clone());
        }
    }
    schema
}

fn insert_bounds(schema: &mut Value, minimum: Option<Value>, maximum: Option<Value>) {
    if let Value::Object(map) = schema {
        if let Some(min) = minimum {
            map.insert("minimum".to_string(), min);
        }
        if let Some(max) = maximum {
            map.insert("maximum".to_string(), max);
        }
    }
}
