//! Addresses and the memory blocks the driver reads atomically.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// An unsigned 32-bit emulator memory address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(pub u32);

/// Mapper schema documents spell addresses as either a bare JSON number or a
/// `0x`-prefixed hex string (§6); accept both rather than forcing every
/// schema author onto one spelling.
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u32),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Address(value)),
            Repr::Text(text) => {
                Address::parse(&text).map_err(serde::de::Error::custom)
            }
        }
    }
}

impl Address {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Parses either a decimal literal or a `0x`-prefixed hex literal, as
    /// mapper schema documents allow for every address field (§6).
    pub fn parse(text: &str) -> Result<Self, AddressParseError> {
        let text = text.trim();
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            u32::from_str_radix(hex, 16).map_err(|_| AddressParseError(text.to_string()))?
        } else {
            text.parse::<u32>()
                .map_err(|_| AddressParseError(text.to_string()))?
        };
        Ok(Self(value))
    }

    pub fn checked_add(self, offset: u32) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Lowercase, unpadded hex, matching the wire protocol's `READ_CORE_MEMORY`
/// address token exactly (§4.1, §6: "lowercase hex addresses").
pub struct WireHex(pub Address);

impl fmt::Display for WireHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid address literal: {0:?}")]
pub struct AddressParseError(pub String);

/// A contiguous range the driver reads as a single atomic chunked transfer.
///
/// Invariant (§3): `start <= end`. Across a mapper, blocks are sorted,
/// non-overlapping, and cover every property's address range — enforced by
/// the mapper loader, not by this type itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub name: String,
    pub start: Address,
    pub end: Address,
}

impl MemoryBlock {
    pub fn new(name: impl Into<String>, start: Address, end: Address) -> Result<Self, BlockError> {
        if start.get() > end.get() {
            return Err(BlockError::Inverted { start, end });
        }
        Ok(Self {
            name: name.into(),
            start,
            end,
        })
    }

    /// Number of bytes spanned by this block, inclusive of both ends.
    pub fn len(&self) -> u32 {
        self.end.get() - self.start.get() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains_range(&self, addr: Address, len: u32) -> bool {
        let Some(last) = addr.get().checked_add(len.saturating_sub(1)) else {
            return false;
        };
        addr.get() >= self.start.get() && last <= self.end.get()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("memory block start {start} is after end {end}")]
    Inverted { start: Address, end: Address },
}
