//! The closed set of property types and the byte-order they decode with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

/// Every type a property can decode as (§3). Unknown types are rejected at
/// mapper load, which is why this is a closed `enum` rather than a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    Bool,
    Bit,
    Nibble,
    Bcd,
    String,
    Bitfield,
    Float32,
    Float64,
    Pointer,
    Array,
    Struct,
    Enum,
    Flags,
    Time,
    Version,
    Checksum,
    Coordinate,
    Color,
    Percentage,
}

impl PropertyType {
    /// Default byte length for a bare declaration of this type (§3: `length`
    /// defaults to 1 byte unless the property overrides it).
    pub const fn default_length(self) -> u32 {
        match self {
            PropertyType::Uint8
            | PropertyType::Int8
            | PropertyType::Bool
            | PropertyType::Bit
            | PropertyType::Nibble
            | PropertyType::Bcd => 1,
            PropertyType::Uint16 | PropertyType::Int16 => 2,
            PropertyType::Uint32 | PropertyType::Int32 | PropertyType::Float32 => 4,
            PropertyType::Float64 => 8,
            PropertyType::Pointer => 4,
            _ => 1,
        }
    }

    /// Whether this type requires `position` to be set and in range (§3:
    /// "bit/nibble properties have position set and in range").
    pub const fn requires_position(self) -> bool {
        matches!(self, PropertyType::Bit | PropertyType::Nibble)
    }

    pub const fn max_position(self) -> u8 {
        match self {
            PropertyType::Bit => 7,
            PropertyType::Nibble => 1,
            _ => 0,
        }
    }

    /// Widest `length` (in bytes) this type's decode/encode can represent
    /// without losing precision to a `u64`/`i64` accumulator (§4.2). `None`
    /// means the type's decode rule doesn't accumulate over the whole byte
    /// run, so any length is safe (`string`, `bool`, `bit`, `nibble`, `bcd`,
    /// and the composite types).
    pub const fn max_length(self) -> Option<u32> {
        match self {
            PropertyType::Uint8
            | PropertyType::Uint16
            | PropertyType::Uint32
            | PropertyType::Int8
            | PropertyType::Int16
            | PropertyType::Int32
            | PropertyType::Bitfield
            | PropertyType::Pointer
            | PropertyType::Enum
            | PropertyType::Flags
            | PropertyType::Checksum
            | PropertyType::Time
            | PropertyType::Version
            | PropertyType::Coordinate
            | PropertyType::Color
            | PropertyType::Percentage => Some(8),
            PropertyType::Float32 => Some(4),
            PropertyType::Float64 => Some(8),
            PropertyType::Bool
            | PropertyType::Bit
            | PropertyType::Nibble
            | PropertyType::Bcd
            | PropertyType::String
            | PropertyType::Array
            | PropertyType::Struct => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        f.write_str(&s)
    }
}

impl FromStr for PropertyType {
    type Err = UnknownPropertyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| UnknownPropertyType(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown property type: {0:?}")]
pub struct UnknownPropertyType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant_through_its_wire_name() {
        let variants = [
            PropertyType::Uint8,
            PropertyType::Uint16,
            PropertyType::Uint32,
            PropertyType::Int8,
            PropertyType::Int16,
            PropertyType::Int32,
            PropertyType::Bool,
            PropertyType::Bit,
            PropertyType::Nibble,
            PropertyType::Bcd,
            PropertyType::String,
            PropertyType::Bitfield,
            PropertyType::Float32,
            PropertyType::Float64,
            PropertyType::Pointer,
            PropertyType::Array,
            PropertyType::Struct,
            PropertyType::Enum,
            PropertyType::Flags,
            PropertyType::Time,
            PropertyType::Version,
            PropertyType::Checksum,
            PropertyType::Coordinate,
            PropertyType::Color,
            PropertyType::Percentage,
        ];
        for variant in variants {
            let name = variant.to_string();
            assert_eq!(PropertyType::from_str(&name).unwrap(), variant);
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(PropertyType::from_str("nonsense").is_err());
    }

    #[test]
    fn bit_and_nibble_require_position() {
        assert!(PropertyType::Bit.requires_position());
        assert!(PropertyType::Nibble.requires_position());
        assert!(!PropertyType::Uint8.requires_position());
    }

    #[test]
    fn integer_like_types_cap_at_eight_bytes() {
        assert_eq!(PropertyType::Uint16.max_length(), Some(8));
        assert_eq!(PropertyType::Checksum.max_length(), Some(8));
        assert_eq!(PropertyType::Float32.max_length(), Some(4));
        assert_eq!(PropertyType::String.max_length(), None);
        assert_eq!(PropertyType::Bcd.max_length(), None);
    }
}
