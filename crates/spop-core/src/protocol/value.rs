//! Typed key-value codec for the self-describing wire value format.
//!
//! Each key-value pair is encoded as:
//! ```text
//! [name_len:4][name:N][tag:1][value:...]
//! ```
//! All multi-byte integers are big-endian.  The tag byte deterministically
//! selects the value decode path; an unrecognized tag is a hard decode error
//! rather than a silently dropped value, so wire drift surfaces immediately.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Serialize, Serializer};

use crate::protocol::ProtocolError;

/// Wire tag codes for the typed value encoding.
pub mod tag {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const INT32: u8 = 2;
    pub const UINT32: u8 = 3;
    pub const INT64: u8 = 4;
    pub const UINT64: u8 = 5;
    pub const IPV4: u8 = 6;
    pub const IPV6: u8 = 7;
    pub const STRING: u8 = 8;
    pub const BINARY: u8 = 9;
}

/// A self-describing scalar or blob carried in a key-value pair.
///
/// The JSON representation used for the downstream sink maps `Null` to JSON
/// null, the numeric variants to JSON numbers, addresses to their canonical
/// string form, and `Binary` to an array of byte values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    String(String),
    Binary(Vec<u8>),
}

impl TypedValue {
    /// Returns the wire tag byte for this value.
    pub fn tag(&self) -> u8 {
        match self {
            TypedValue::Null => tag::NULL,
            TypedValue::Bool(_) => tag::BOOL,
            TypedValue::Int32(_) => tag::INT32,
            TypedValue::UInt32(_) => tag::UINT32,
            TypedValue::Int64(_) => tag::INT64,
            TypedValue::UInt64(_) => tag::UINT64,
            TypedValue::Ipv4(_) => tag::IPV4,
            TypedValue::Ipv6(_) => tag::IPV6,
            TypedValue::String(_) => tag::STRING,
            TypedValue::Binary(_) => tag::BINARY,
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TypedValue::Null => serializer.serialize_unit(),
            TypedValue::Bool(v) => serializer.serialize_bool(*v),
            TypedValue::Int32(v) => serializer.serialize_i32(*v),
            TypedValue::UInt32(v) => serializer.serialize_u32(*v),
            TypedValue::Int64(v) => serializer.serialize_i64(*v),
            TypedValue::UInt64(v) => serializer.serialize_u64(*v),
            TypedValue::Ipv4(v) => serializer.collect_str(v),
            TypedValue::Ipv6(v) => serializer.collect_str(v),
            TypedValue::String(v) => serializer.serialize_str(v),
            TypedValue::Binary(v) => serializer.collect_seq(v.iter()),
        }
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one key-value pair starting at `offset`.
///
/// Returns the key name, the decoded value, and the offset of the byte after
/// the pair, so the caller can advance its cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if the buffer is shorter than
/// any declared length requires or the name/string bytes are not valid UTF-8,
/// and [`ProtocolError::UnknownDataType`] for an unrecognized tag byte.
pub fn decode_kv(
    bytes: &[u8],
    offset: usize,
) -> Result<(String, TypedValue, usize), ProtocolError> {
    let (name, offset) = read_length_prefixed_string(bytes, offset)?;

    require_len(bytes, offset + 1, "value tag")?;
    let tag_byte = bytes[offset];
    let (value, offset) = decode_value(bytes, offset + 1, tag_byte)?;

    Ok((name, value, offset))
}

fn decode_value(
    bytes: &[u8],
    offset: usize,
    tag_byte: u8,
) -> Result<(TypedValue, usize), ProtocolError> {
    match tag_byte {
        tag::NULL => Ok((TypedValue::Null, offset)),
        tag::BOOL => {
            require_len(bytes, offset + 1, "BOOL value")?;
            Ok((TypedValue::Bool(bytes[offset] != 0), offset + 1))
        }
        tag::INT32 => {
            let raw = read_fixed::<4>(bytes, offset, "INT32 value")?;
            Ok((TypedValue::Int32(i32::from_be_bytes(raw)), offset + 4))
        }
        tag::UINT32 => {
            let raw = read_fixed::<4>(bytes, offset, "UINT32 value")?;
            Ok((TypedValue::UInt32(u32::from_be_bytes(raw)), offset + 4))
        }
        tag::INT64 => {
            let raw = read_fixed::<8>(bytes, offset, "INT64 value")?;
            Ok((TypedValue::Int64(i64::from_be_bytes(raw)), offset + 8))
        }
        tag::UINT64 => {
            let raw = read_fixed::<8>(bytes, offset, "UINT64 value")?;
            Ok((TypedValue::UInt64(u64::from_be_bytes(raw)), offset + 8))
        }
        tag::IPV4 => {
            let raw = read_fixed::<4>(bytes, offset, "IPV4 value")?;
            Ok((TypedValue::Ipv4(Ipv4Addr::from(raw)), offset + 4))
        }
        tag::IPV6 => {
            let raw = read_fixed::<16>(bytes, offset, "IPV6 value")?;
            Ok((TypedValue::Ipv6(Ipv6Addr::from(raw)), offset + 16))
        }
        tag::STRING => {
            let (s, offset) = read_length_prefixed_string(bytes, offset)?;
            Ok((TypedValue::String(s), offset))
        }
        tag::BINARY => {
            let (b, offset) = read_length_prefixed_bytes(bytes, offset)?;
            Ok((TypedValue::Binary(b.to_vec()), offset))
        }
        other => Err(ProtocolError::UnknownDataType(other)),
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Appends one encoded key-value pair to `buf`.  Exact inverse of
/// [`decode_kv`].
pub fn encode_kv(buf: &mut Vec<u8>, name: &str, value: &TypedValue) {
    write_length_prefixed_bytes(buf, name.as_bytes());
    buf.push(value.tag());
    match value {
        TypedValue::Null => {}
        TypedValue::Bool(v) => buf.push(u8::from(*v)),
        TypedValue::Int32(v) => buf.extend_from_slice(&v.to_be_bytes()),
        TypedValue::UInt32(v) => buf.extend_from_slice(&v.to_be_bytes()),
        TypedValue::Int64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        TypedValue::UInt64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        TypedValue::Ipv4(v) => buf.extend_from_slice(&v.octets()),
        TypedValue::Ipv6(v) => buf.extend_from_slice(&v.octets()),
        TypedValue::String(v) => write_length_prefixed_bytes(buf, v.as_bytes()),
        TypedValue::Binary(v) => write_length_prefixed_bytes(buf, v),
    }
}

// ── Shared payload helpers ────────────────────────────────────────────────────

pub(crate) fn require_len(
    bytes: &[u8],
    needed: usize,
    context: &str,
) -> Result<(), ProtocolError> {
    if bytes.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            bytes.len()
        )))
    } else {
        Ok(())
    }
}

fn read_fixed<const N: usize>(
    bytes: &[u8],
    offset: usize,
    context: &str,
) -> Result<[u8; N], ProtocolError> {
    require_len(bytes, offset + N, context)?;
    let mut raw = [0u8; N];
    raw.copy_from_slice(&bytes[offset..offset + N]);
    Ok(raw)
}

/// Writes a 4-byte length prefix followed by the raw bytes.
pub(crate) fn write_length_prefixed_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Reads a 4-byte length prefix and then that many raw bytes.
/// Returns the slice and the offset of the byte after it.
pub(crate) fn read_length_prefixed_bytes(
    bytes: &[u8],
    offset: usize,
) -> Result<(&[u8], usize), ProtocolError> {
    let raw = read_fixed::<4>(bytes, offset, "length prefix")?;
    let len = u32::from_be_bytes(raw) as usize;
    let start = offset + 4;
    if bytes.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "field of length {len} at offset {start} exceeds buffer"
        )));
    }
    Ok((&bytes[start..start + len], start + len))
}

/// Reads a 4-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after it.
pub(crate) fn read_length_prefixed_string(
    bytes: &[u8],
    offset: usize,
) -> Result<(String, usize), ProtocolError> {
    let (raw, end) = read_length_prefixed_bytes(bytes, offset)?;
    let s = std::str::from_utf8(raw)
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, end))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: TypedValue) -> TypedValue {
        let mut buf = Vec::new();
        encode_kv(&mut buf, "key", &value);
        let (name, decoded, consumed) = decode_kv(&buf, 0).expect("decode failed");
        assert_eq!(name, "key");
        assert_eq!(consumed, buf.len(), "all bytes must be consumed");
        decoded
    }

    #[test]
    fn test_null_round_trip() {
        assert_eq!(round_trip(TypedValue::Null), TypedValue::Null);
    }

    #[test]
    fn test_bool_round_trip() {
        assert_eq!(round_trip(TypedValue::Bool(true)), TypedValue::Bool(true));
        assert_eq!(round_trip(TypedValue::Bool(false)), TypedValue::Bool(false));
    }

    #[test]
    fn test_int32_round_trip() {
        assert_eq!(
            round_trip(TypedValue::Int32(-123_456)),
            TypedValue::Int32(-123_456)
        );
    }

    #[test]
    fn test_uint32_round_trip() {
        assert_eq!(
            round_trip(TypedValue::UInt32(u32::MAX)),
            TypedValue::UInt32(u32::MAX)
        );
    }

    #[test]
    fn test_int64_round_trip() {
        assert_eq!(
            round_trip(TypedValue::Int64(i64::MIN)),
            TypedValue::Int64(i64::MIN)
        );
    }

    #[test]
    fn test_uint64_round_trip() {
        assert_eq!(
            round_trip(TypedValue::UInt64(u64::MAX)),
            TypedValue::UInt64(u64::MAX)
        );
    }

    #[test]
    fn test_ipv4_round_trip() {
        let addr = TypedValue::Ipv4("203.0.113.9".parse().unwrap());
        assert_eq!(round_trip(addr.clone()), addr);
    }

    #[test]
    fn test_ipv6_round_trip() {
        let addr = TypedValue::Ipv6("2001:db8::42".parse().unwrap());
        assert_eq!(round_trip(addr.clone()), addr);
    }

    #[test]
    fn test_string_round_trip() {
        let value = TypedValue::String("GET /index.html".to_string());
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_empty_string_round_trip() {
        let value = TypedValue::String(String::new());
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_binary_round_trip() {
        let value = TypedValue::Binary(vec![0x00, 0xFF, 0x7F, 0x80]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_unknown_tag_is_a_decode_error() {
        let mut buf = Vec::new();
        write_length_prefixed_bytes(&mut buf, b"key");
        buf.push(0x0A); // one past the highest known tag

        let result = decode_kv(&buf, 0);
        assert_eq!(result, Err(ProtocolError::UnknownDataType(0x0A)));
    }

    #[test]
    fn test_name_length_past_buffer_is_malformed() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u32.to_be_bytes()); // claims a 100-byte name
        buf.extend_from_slice(b"short");

        let result = decode_kv(&buf, 0);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_truncated_scalar_is_malformed() {
        let mut buf = Vec::new();
        write_length_prefixed_bytes(&mut buf, b"port");
        buf.push(tag::UINT32);
        buf.extend_from_slice(&[0x00, 0x01]); // only 2 of 4 value bytes

        let result = decode_kv(&buf, 0);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_invalid_utf8_name_is_malformed() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[0xFF, 0xFE]);
        buf.push(tag::NULL);

        let result = decode_kv(&buf, 0);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_missing_tag_byte_is_malformed() {
        let mut buf = Vec::new();
        write_length_prefixed_bytes(&mut buf, b"key");
        // buffer ends before the tag byte

        let result = decode_kv(&buf, 0);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_json_shape_of_scalars() {
        assert_eq!(serde_json::to_string(&TypedValue::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&TypedValue::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&TypedValue::Int32(-5)).unwrap(), "-5");
        assert_eq!(
            serde_json::to_string(&TypedValue::UInt64(9000)).unwrap(),
            "9000"
        );
    }

    #[test]
    fn test_json_shape_of_addresses_and_blobs() {
        let v4 = TypedValue::Ipv4("192.0.2.1".parse().unwrap());
        assert_eq!(serde_json::to_string(&v4).unwrap(), "\"192.0.2.1\"");

        let v6 = TypedValue::Ipv6("2001:db8::1".parse().unwrap());
        assert_eq!(serde_json::to_string(&v6).unwrap(), "\"2001:db8::1\"");

        let bin = TypedValue::Binary(vec![1, 2, 3]);
        assert_eq!(serde_json::to_string(&bin).unwrap(), "[1,2,3]");
    }
}
