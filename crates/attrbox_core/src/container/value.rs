//! Typed attribute values exposed by containers.
//!
//! # Responsibility
//! - Give container projections one value type that downstream serializers
//!   and filter engines can consume without knowing the concrete record.
//! - Convert between container field types and projected values.
//!
//! # Invariants
//! - Serialization is untagged: values appear on the wire as plain JSON
//!   scalars (`null`, bool, number, string).
//! - `Integer` and `Float` are equal only when the float represents the
//!   integer exactly.

use crate::container::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value of one container attribute at projection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Attribute is declared but currently unset.
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Back-reference to another container.
    ///
    /// Deserializes as `String`; field conversion parses it back.
    Identifier(Identifier),
}

impl AttributeValue {
    /// Stable name of the value kind, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Identifier(_) => "identifier",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Converts into an optional field value, mapping `Null` to `None`.
    pub fn into_optional<T>(self) -> Result<Option<T>, ValueTypeError>
    where
        T: TryFrom<AttributeValue, Error = ValueTypeError>,
    {
        if self.is_null() {
            return Ok(None);
        }
        T::try_from(self).map(Some)
    }
}

/// Returns the integer a float represents exactly, if any.
///
/// `-0.0` maps to `0`. Non-finite, fractional and out-of-range floats yield
/// `None`.
pub(crate) fn exact_integer(value: f64) -> Option<i64> {
    // i64::MIN is a power of two, so it and 2^63 are exact in f64.
    const LOWER: f64 = i64::MIN as f64;
    const UPPER: f64 = -(i64::MIN as f64);
    if !value.is_finite() || value.fract() != 0.0 || value < LOWER || value >= UPPER {
        return None;
    }
    Some(value as i64)
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Integer(int), Self::Float(float)) | (Self::Float(float), Self::Integer(int)) => {
                exact_integer(*float) == Some(*int)
            }
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Identifier(left), Self::Identifier(right)) => left == right,
            _ => false,
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::String(value) => write!(f, "{value}"),
            Self::Identifier(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Identifier> for AttributeValue {
    fn from(value: Identifier) -> Self {
        Self::Identifier(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<AttributeValue> for bool {
    type Error = ValueTypeError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Bool(inner) => Ok(inner),
            other => Err(ValueTypeError::new("bool", &other)),
        }
    }
}

impl TryFrom<AttributeValue> for i64 {
    type Error = ValueTypeError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Integer(inner) => Ok(inner),
            other => Err(ValueTypeError::new("integer", &other)),
        }
    }
}

impl TryFrom<AttributeValue> for f64 {
    type Error = ValueTypeError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Float(inner) => Ok(inner),
            AttributeValue::Integer(inner) => Ok(inner as f64),
            other => Err(ValueTypeError::new("float", &other)),
        }
    }
}

impl TryFrom<AttributeValue> for String {
    type Error = ValueTypeError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::String(inner) => Ok(inner),
            other => Err(ValueTypeError::new("string", &other)),
        }
    }
}

impl TryFrom<AttributeValue> for Identifier {
    type Error = ValueTypeError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Identifier(inner) => Ok(inner),
            AttributeValue::String(raw) => Identifier::copy_from_string(&raw)
                .map_err(|_| ValueTypeError {
                    expected: "identifier",
                    found: "string",
                }),
            other => Err(ValueTypeError::new("identifier", &other)),
        }
    }
}

/// Raised when a projected value cannot be converted into a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ValueTypeError {
    fn new(expected: &'static str, found: &AttributeValue) -> Self {
        Self {
            expected,
            found: found.type_name(),
        }
    }
}

impl Display for ValueTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "attribute value type mismatch: expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl Error for ValueTypeError {}

#[cfg(test)]
mod tests {
    use super::{exact_integer, AttributeValue, ValueTypeError};
    use crate::container::identifier::Identifier;

    #[test]
    fn integer_and_float_compare_numerically() {
        assert_eq!(AttributeValue::Integer(3), AttributeValue::Float(3.0));
        assert_ne!(AttributeValue::Integer(3), AttributeValue::Float(3.5));
        assert_ne!(
            AttributeValue::Integer(3),
            AttributeValue::String("3".to_string())
        );
    }

    #[test]
    fn integer_float_equality_is_exact_beyond_f64_mantissa() {
        let two_pow_53: i64 = 1 << 53;
        let float = AttributeValue::Float(two_pow_53 as f64);

        assert_eq!(AttributeValue::Integer(two_pow_53), float);
        assert_ne!(AttributeValue::Integer(two_pow_53 + 1), float);
        assert_ne!(
            AttributeValue::Integer(i64::MAX),
            AttributeValue::Float(i64::MAX as f64)
        );
        assert_eq!(
            AttributeValue::Integer(i64::MIN),
            AttributeValue::Float(i64::MIN as f64)
        );
        assert_ne!(AttributeValue::Integer(0), AttributeValue::Float(f64::NAN));
        assert_eq!(AttributeValue::Integer(0), AttributeValue::Float(-0.0));
    }

    #[test]
    fn exact_integer_rejects_fractional_and_non_finite() {
        assert_eq!(exact_integer(3.0), Some(3));
        assert_eq!(exact_integer(-0.0), Some(0));
        assert_eq!(exact_integer(3.5), None);
        assert_eq!(exact_integer(f64::INFINITY), None);
        assert_eq!(exact_integer(9.3e18), None);
    }

    #[test]
    fn display_renders_plain_values() {
        assert_eq!(AttributeValue::from("text").to_string(), "text");
        assert_eq!(AttributeValue::from(7_i64).to_string(), "7");
        assert_eq!(AttributeValue::from(1.0_f64).to_string(), "1.0");
        assert_eq!(AttributeValue::from(true).to_string(), "true");
        assert_eq!(
            AttributeValue::from(Identifier::with_sequence("event", 2)).to_string(),
            "event.2"
        );
    }

    #[test]
    fn option_maps_to_null() {
        assert!(AttributeValue::from(None::<String>).is_null());
        assert_eq!(
            AttributeValue::from(Some("set")),
            AttributeValue::String("set".to_string())
        );
    }

    #[test]
    fn into_optional_converts_or_reports_mismatch() {
        let empty: Option<String> = AttributeValue::Null.into_optional().unwrap();
        assert_eq!(empty, None);

        let err = AttributeValue::Integer(1)
            .into_optional::<String>()
            .unwrap_err();
        assert_eq!(
            err,
            ValueTypeError {
                expected: "string",
                found: "integer",
            }
        );
    }

    #[test]
    fn identifier_converts_from_its_string_form() {
        let identifier = Identifier::try_from(AttributeValue::from("event_data.9")).unwrap();
        assert_eq!(identifier, Identifier::with_sequence("event_data", 9));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_value(AttributeValue::from("x")).unwrap();
        assert_eq!(json, serde_json::json!("x"));
        let json = serde_json::to_value(AttributeValue::Null).unwrap();
        assert_eq!(json, serde_json::Value::Null);
    }
}
