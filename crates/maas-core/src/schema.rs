//! Shape validation for loosely-typed JSON responses.
//!
//! A [`Schema`] declares named fields and their expected [`FieldType`]. Coercing a
//! decoded [`Value`] either yields a [`Coerced`] map whose declared fields are
//! guaranteed present and well-typed, or a [`SchemaError`] naming the offending
//! field. Missing required fields are failures; no defaults are injected.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Expected type of a field or element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON number with an integral value
    Int,
    /// Any JSON number
    Float,
    /// JSON boolean
    Bool,
    /// Anything, including null
    Any,
    /// Array whose elements all match
    List(Box<FieldType>),
    /// Object whose values all match
    Map(Box<FieldType>),
}

impl FieldType {
    /// A list of `element`.
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// An object whose values are `element`.
    #[must_use]
    pub fn map(element: Self) -> Self {
        Self::Map(Box::new(element))
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let ok = match (self, value) {
            (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Float, Value::Number(_)) => true,
            (Self::Int, Value::Number(number)) => number.is_i64() || number.is_u64(),
            (Self::List(element), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    element.check(item, &format!("{path}[{index}]"))?;
                }
                true
            }
            (Self::Map(element), Value::Object(entries)) => {
                for (key, item) in entries {
                    element.check(item, &format!("{path}.{key}"))?;
                }
                true
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(SchemaError::mismatch(path, self, value))
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::Any => f.write_str("any"),
            Self::List(element) => write!(f, "list of {element}"),
            Self::Map(element) => write!(f, "map of {element}"),
        }
    }
}

/// A structured coercion failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The value being coerced was not a JSON object.
    #[error("expected object, got {got}")]
    NotAnObject {
        /// JSON type actually found
        got: String,
    },

    /// A required field was absent.
    #[error("{field}: expected value, got nothing")]
    Missing {
        /// Field name
        field: String,
    },

    /// A field or element had the wrong type.
    #[error("{path}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Field path, e.g. `capabilities[1]`
        path: String,
        /// Expected type
        expected: String,
        /// JSON type actually found
        got: String,
    },
}

impl SchemaError {
    /// A missing required field.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    /// A value whose type did not match.
    #[must_use]
    pub fn mismatch(path: &str, expected: &FieldType, value: &Value) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            got: json_type(value).to_string(),
        }
    }

    /// A top-level value that was not an object.
    #[must_use]
    pub fn not_an_object(value: &Value) -> Self {
        Self::NotAnObject {
            got: json_type(value).to_string(),
        }
    }
}

/// Name of a JSON value's type, as used in error messages.
#[must_use]
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    field_type: FieldType,
    required: bool,
}

/// Declared shape of a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Create a schema with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field that must be present.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
            required: true,
        });
        self
    }

    /// Declare a field that may be absent or null.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
            required: false,
        });
        self
    }

    /// Validate `value` against the schema.
    ///
    /// Undeclared fields are dropped from the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] encountered, in declaration order.
    pub fn coerce(&self, value: &Value) -> Result<Coerced, SchemaError> {
        let object = value
            .as_object()
            .ok_or_else(|| SchemaError::not_an_object(value))?;

        let mut fields = Map::new();
        for field in &self.fields {
            match object.get(&field.name) {
                Some(Value::Null) | None if !field.required => {}
                None => return Err(SchemaError::missing(&field.name)),
                Some(found) => {
                    field.field_type.check(found, &field.name)?;
                    fields.insert(field.name.clone(), found.clone());
                }
            }
        }

        Ok(Coerced { fields })
    }
}

/// Result of a successful coercion.
///
/// Accessors return `None` only for optional fields that were absent; declared
/// fields are already known to have their declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    fields: Map<String, Value>,
}

impl Coerced {
    /// Raw access to a coerced field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A string field.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// A list-of-strings field.
    #[must_use]
    pub fn string_list(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }
}
