//! The decoded/transformed value a property resolves to for one tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A property's value after decode + transform. Kept as a small closed set
/// rather than `serde_json::Value` so that numeric transforms (§4.3 step 3)
/// have somewhere unambiguous to do arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            PropertyValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PropertyValue::Integer(_) | PropertyValue::Float(_))
    }

    /// The type-specific zero value used by the decode failure policy (§4.3:
    /// "resolves to a type-specific default").
    pub fn numeric_default() -> Self {
        PropertyValue::Integer(0)
    }

    pub fn string_default() -> Self {
        PropertyValue::Text(String::new())
    }

    pub fn bool_default() -> Self {
        PropertyValue::Bool(false)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Integer(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Text(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_coerces_to_numeric_one_or_zero() {
        assert_eq!(PropertyValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(PropertyValue::Bool(false).as_f64(), Some(0.0));
    }

    #[test]
    fn text_is_not_numeric() {
        assert_eq!(PropertyValue::Text("hi".into()).as_f64(), None);
    }
}
