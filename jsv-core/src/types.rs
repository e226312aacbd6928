//! The JSON data-type model used by rule groups and the `type` keyword.

use serde_json::Value;
use std::fmt;

/// The seven primitive types of JSON Schema draft-07.
///
/// `Integer` is distinguished from `Number` by integrality of the value,
/// not by its lexical form: `1.0` is an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// Any JSON number.
    Number,
    /// A JSON number with no fractional part.
    Integer,
    /// A JSON string.
    String,
}

impl JsonType {
    /// Parse a draft-07 type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(JsonType::Null),
            "boolean" => Some(JsonType::Boolean),
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "string" => Some(JsonType::String),
            _ => None,
        }
    }

    /// The draft-07 name of this type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::String => "string",
        }
    }

    /// Whether `value` belongs to this type.
    ///
    /// `Number` accepts integers; `Integer` accepts floats whose
    /// fractional part is zero.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonType::Null => value.is_null(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            JsonType::String => value.is_string(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The most specific [`JsonType`] of a value.
///
/// Integral numbers report `Integer`.
#[must_use]
pub fn data_type_of(value: &Value) -> JsonType {
    match value {
        Value::Null => JsonType::Null,
        Value::Bool(_) => JsonType::Boolean,
        Value::Number(_) => {
            if JsonType::Integer.matches(value) {
                JsonType::Integer
            } else {
                JsonType::Number
            }
        }
        Value::String(_) => JsonType::String,
        Value::Array(_) => JsonType::Array,
        Value::Object(_) => JsonType::Object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_is_a_number() {
        assert!(JsonType::Number.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3.0)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn data_type_distinguishes_integral_floats() {
        assert_eq!(data_type_of(&json!(2.0)), JsonType::Integer);
        assert_eq!(data_type_of(&json!(2.5)), JsonType::Number);
        assert_eq!(data_type_of(&json!("2")), JsonType::String);
    }

    #[test]
    fn round_trips_names() {
        for name in ["null", "boolean", "object", "array", "number", "integer", "string"] {
            let ty = JsonType::from_name(name).expect("known type");
            assert_eq!(ty.name(), name);
        }
        assert!(JsonType::from_name("float").is_none());
    }
}
