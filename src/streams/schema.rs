//! Record schemas
//!
//! Streams declare their fields statically; `discover` renders them as JSON Schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Number => write!(f, "number"),
        }
    }
}

/// A single declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name as emitted
    pub name: String,
    /// Value type
    pub json_type: JsonType,
    /// Format hint (`date`, `date-time`)
    pub format: Option<&'static str>,
    /// Records missing this field are not emitted
    pub required: bool,
}

impl Field {
    /// Optional string field
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json_type: JsonType::String,
            format: None,
            required: false,
        }
    }

    /// Optional field of any type
    pub fn typed(name: impl Into<String>, json_type: JsonType) -> Self {
        Self {
            json_type,
            ..Self::string(name)
        }
    }

    /// Set the format hint
    #[must_use]
    pub fn with_format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    /// Mark the field as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        if self.required {
            property.insert("type".into(), json!(self.json_type));
        } else {
            property.insert("type".into(), json!([self.json_type, "null"]));
        }
        if let Some(format) = self.format {
            property.insert("format".into(), json!(format));
        }
        Value::Object(property)
    }
}

/// Schema of one stream's records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSchema {
    /// Declared fields, in output order
    pub fields: Vec<Field>,
}

impl StreamSchema {
    /// Create a schema from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Names of the required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self.required_fields().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
