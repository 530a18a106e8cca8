//! Declarative shapes for request inputs and response bodies.
//!
//! A [`Schema`] describes a JSON value; a [`ParamKind`] describes a single path or
//! query parameter that arrives as text and is coerced to a typed [`ParamValue`].

use serde::Serialize;
use std::fmt;

/// The shape of a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    /// An RFC 3339 timestamp string.
    DateTime,
    Nullable(Box<Schema>),
    Array(Box<Schema>),
    Object(ObjectSchema),
}

impl Schema {
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    pub fn array_of(item: Schema) -> Schema {
        Schema::Array(Box::new(item))
    }

    pub fn nullable(inner: Schema) -> Schema {
        Schema::Nullable(Box::new(inner))
    }

    /// Short human-readable name of the expected shape, used in validation issues.
    pub fn describe(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Integer => "integer".to_string(),
            Schema::Number => "number".to_string(),
            Schema::String => "string".to_string(),
            Schema::DateTime => "RFC 3339 date-time string".to_string(),
            Schema::Nullable(inner) => format!("{} or null", inner.describe()),
            Schema::Array(item) => format!("array of {}", item.describe()),
            Schema::Object(_) => "object".to_string(),
        }
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::Object(object)
    }
}

/// A field of an [`ObjectSchema`]. Fields are required unless declared optional.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub schema: Schema,
    pub optional: bool,
}

/// ObjectSchema
///
/// A closed JSON object: every declared field is checked in declaration order and any
/// key not declared here is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            schema,
            optional: false,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            schema,
            optional: true,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How a textual path or query parameter is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean (true or false)",
        }
    }

    /// Coerces the raw text of a parameter. `None` means the text does not fit the kind.
    pub fn coerce(&self, raw: &str) -> Option<ParamValue> {
        match self {
            ParamKind::Integer => raw.parse::<i64>().ok().map(ParamValue::Integer),
            ParamKind::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ParamValue::Number),
            ParamKind::String => Some(ParamValue::String(raw.to_string())),
            ParamKind::Boolean => match raw {
                "true" => Some(ParamValue::Boolean(true)),
                "false" => Some(ParamValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

/// A declared path or query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSchema {
    pub name: String,
    pub kind: ParamKind,
    pub optional: bool,
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Number(f64),
    String(String),
    Boolean(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::String(v) => f.write_str(v),
            ParamValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}
