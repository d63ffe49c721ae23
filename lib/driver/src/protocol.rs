//! Wire-level framing for the emulator's line-terminated ASCII protocol
//! (§4.1, §6). Every function here is pure so the framing can be exercised
//! without a socket.

use shared::address::WireHex;
use shared::Address;

/// `READ_CORE_MEMORY <hex_addr> <dec_len>\n`
pub fn encode_read_request(addr: Address, len: u32) -> String {
    format!("READ_CORE_MEMORY {} {}\n", WireHex(addr), len)
}

/// `WRITE_CORE_MEMORY <hex_addr> <hex_bytes...>\n`
pub fn encode_write_request(addr: Address, bytes: &[u8]) -> String {
    let mut out = format!("WRITE_CORE_MEMORY {} ", WireHex(addr));
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.push('\n');
    out
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("reply missing the READ_CORE_MEMORY/WRITE_CORE_MEMORY preamble: {0:?}")]
    MissingPreamble(String),
    #[error("reply address {reply} does not match requested address {requested}")]
    AddressMismatch { requested: String, reply: String },
    #[error("reply byte token is not two hex digits: {0:?}")]
    BadByteToken(String),
}

/// A decoded `READ_CORE_MEMORY` reply: bytes, with a per-byte soft-failure
/// mask for tokens the emulator reported as `-1` (unreadable). §4.1: those
/// bytes are reported as `0x00` and the read is soft-failed only for them —
/// the call is not retried wholesale because of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    pub bytes: Vec<u8>,
    pub unreadable: Vec<bool>,
}

impl ReadReply {
    pub fn any_unreadable(&self) -> bool {
        self.unreadable.iter().any(|&u| u)
    }
}

/// Parses a `READ_CORE_MEMORY` reply line for the chunk starting at `addr`.
pub fn decode_read_reply(line: &str, addr: Address) -> Result<ReadReply, FrameError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut tokens = line.split_whitespace();

    match tokens.next() {
        Some("READ_CORE_MEMORY") => {}
        _ => return Err(FrameError::MissingPreamble(line.to_string())),
    }

    let reply_addr = tokens
        .next()
        .ok_or_else(|| FrameError::MissingPreamble(line.to_string()))?;
    let expected = shared::address::WireHex(addr).to_string();
    if reply_addr != expected {
        return Err(FrameError::AddressMismatch {
            requested: expected,
            reply: reply_addr.to_string(),
        });
    }

    let mut bytes = Vec::new();
    let mut unreadable = Vec::new();
    for token in tokens {
        if token == "-1" {
            bytes.push(0);
            unreadable.push(true);
            continue;
        }
        let value = u8::from_str_radix(token, 16)
            .map_err(|_| FrameError::BadByteToken(token.to_string()))?;
        bytes.push(value);
        unreadable.push(false);
    }

    Ok(ReadReply { bytes, unreadable })
}

/// Parses a `WRITE_CORE_MEMORY` reply, which echoes the written address back
/// on success (§4.1).
pub fn decode_write_reply(line: &str, addr: Address) -> Result<(), FrameError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("WRITE_CORE_MEMORY") => {}
        _ => return Err(FrameError::MissingPreamble(line.to_string())),
    }
    let reply_addr = tokens
        .next()
        .ok_or_else(|| FrameError::MissingPreamble(line.to_string()))?;
    let expected = shared::address::WireHex(addr).to_string();
    if reply_addr != expected {
        return Err(FrameError::AddressMismatch {
            requested: expected,
            reply: reply_addr.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_read_request_with_lowercase_hex_and_decimal_len() {
        let encoded = encode_read_request(Address(0x075A), 1);
        assert_eq!(encoded, "READ_CORE_MEMORY 75a 1\n");
    }

    #[test]
    fn encodes_write_request_with_two_hex_digit_bytes() {
        let encoded = encode_write_request(Address(0x075A), &[0x03, 0xff, 0x00]);
        assert_eq!(encoded, "WRITE_CORE_MEMORY 75a 03 ff 00\n");
    }

    #[test]
    fn decodes_read_reply_happy_path() {
        let reply = decode_read_reply("READ_CORE_MEMORY 75a 03\n", Address(0x075A)).unwrap();
        assert_eq!(reply.bytes, vec![0x03]);
        assert!(!reply.any_unreadable());
    }

    #[test]
    fn decodes_multi_byte_reply_in_order() {
        let reply = decode_read_reply("READ_CORE_MEMORY d16c 2c 01", Address(0xD16C)).unwrap();
        assert_eq!(reply.bytes, vec![0x2c, 0x01]);
    }

    #[test]
    fn sentinel_minus_one_marks_byte_unreadable_without_failing_the_whole_reply() {
        let reply = decode_read_reply("READ_CORE_MEMORY 75a 03 -1 01", Address(0x075A)).unwrap();
        assert_eq!(reply.bytes, vec![0x03, 0x00, 0x01]);
        assert_eq!(reply.unreadable, vec![false, true, false]);
        assert!(reply.any_unreadable());
    }

    #[test]
    fn rejects_mismatched_reply_address() {
        let err = decode_read_reply("READ_CORE_MEMORY 1234 03", Address(0x075A)).unwrap_err();
        assert!(matches!(err, FrameError::AddressMismatch { .. }));
    }

    #[test]
    fn write_reply_echoes_address() {
        decode_write_reply("WRITE_CORE_MEMORY 75a", Address(0x075A)).unwrap();
        assert!(decode_write_reply("WRITE_CORE_MEMORY 1234", Address(0x075A)).is_err());
    }
}
