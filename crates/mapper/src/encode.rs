//! The write pipeline's byte encoders (§4.3 "Write pipeline": "encodes the
//! value to bytes using the inverse of the decode rules"). Each function
//! here is the precise inverse of the matching `memory::decode` helper.

use shared::{Endian, PropertyType, PropertyValue};

/// Errors the write pipeline's encode dispatcher surfaces for a `SetProperty`
/// call — kept separate from the read-side's silent-default policy because a
/// write API call is an explicit request that ought to fail loudly rather
/// than degrade (see DESIGN.md).
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("property type {0} has no inverse encode (composite types cannot be written directly)")]
    NoEncode(PropertyType),

    #[error("value {0} cannot be written to a property of type {1}")]
    TypeMismatch(PropertyValue, PropertyType),
}

/// The write pipeline's inverse of [`memory::decode::decode_property_type`]:
/// encodes a decoded/transformed value back to the exact byte width the
/// property declares (§4.3 "Write pipeline").
pub fn encode_property_type(
    ty: PropertyType,
    value: &PropertyValue,
    len: u32,
    endian: Endian,
) -> Result<Vec<u8>, EncodeError> {
    use PropertyType::*;
    let len = len as usize;
    match ty {
        Uint8 | Uint16 | Uint32 | Bitfield | Pointer | Enum | Flags | Checksum | Time | Version
        | Coordinate | Color => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(encode_uint(n as u64, len, endian))
        }
        Int8 | Int16 | Int32 => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(encode_int(n as i64, len, endian))
        }
        Bool | Bit => {
            let b = match value {
                PropertyValue::Bool(b) => *b,
                PropertyValue::Integer(n) => *n != 0,
                _ => return Err(EncodeError::TypeMismatch(value.clone(), ty)),
            };
            Ok(encode_bool(b))
        }
        Nibble => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(vec![(n as u8) & 0x0F])
        }
        Bcd => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(encode_bcd(n as u64, len))
        }
        Float32 => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(match endian {
                Endian::Little => (n as f32).to_le_bytes().to_vec(),
                Endian::Big => (n as f32).to_be_bytes().to_vec(),
            })
        }
        Float64 => {
            let n = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            Ok(match endian {
                Endian::Little => n.to_le_bytes().to_vec(),
                Endian::Big => n.to_be_bytes().to_vec(),
            })
        }
        String => {
            let s = value
                .as_str()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            let mut bytes: Vec<u8> = s.bytes().take(len).collect();
            bytes.resize(len, 0x00);
            Ok(bytes)
        }
        Percentage => {
            let pct = value
                .as_f64()
                .ok_or_else(|| EncodeError::TypeMismatch(value.clone(), ty))?;
            let max = (1u128 << (len * 8)).saturating_sub(1).min(u64::MAX as u128) as u64;
            let raw = ((pct.clamp(0.0, 100.0) / 100.0) * max as f64).round() as u64;
            Ok(encode_uint(raw, len, endian))
        }
        Array | Struct => Err(EncodeError::NoEncode(ty)),
    }
}

/// Inverse of [`memory::decode::decode_uint`]: encodes `value` into
/// exactly `len` bytes.
pub fn encode_uint(value: u64, len: usize, endian: Endian) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    match endian {
        Endian::Little => {
            for (i, byte) in bytes.iter_mut().enumerate() {
                *byte = if i < 8 { (value >> (8 * i)) as u8 } else { 0 };
            }
        }
        Endian::Big => {
            for (i, byte) in bytes.iter_mut().rev().enumerate() {
                *byte = if i < 8 { (value >> (8 * i)) as u8 } else { 0 };
            }
        }
    }
    bytes
}

/// Inverse of [`memory::decode::decode_int`]: two's-complement encode of a
/// signed value into exactly `len` bytes.
pub fn encode_int(value: i64, len: usize, endian: Endian) -> Vec<u8> {
    let bits = (len * 8) as u32;
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    encode_uint((value as u64) & mask, len, endian)
}

pub fn encode_bool(value: bool) -> Vec<u8> {
    vec![if value { 1 } else { 0 }]
}

/// Inverse of [`memory::decode::decode_bcd`] for a single byte pair fold;
/// encodes `value` (0..=99 per byte) back into packed BCD, most significant
/// byte first.
pub fn encode_bcd(mut value: u64, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    for byte in bytes.iter_mut().rev() {
        let digits = (value % 100) as u8;
        *byte = ((digits / 10) << 4) | (digits % 10);
        value /= 100;
    }
    bytes
}
