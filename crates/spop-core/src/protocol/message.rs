//! Message-level payload parsing: NOTIFY decoding and the HELLO response.
//!
//! NOTIFY payload layout:
//! ```text
//! [name_len:4][name:N][arg_count:2][arg_count × key-value pair]
//! ```
//! The HELLO response is a fixed capability payload, not a negotiated one:
//! the agent always advertises the same version and capabilities regardless
//! of what the peer declared.

use std::collections::HashMap;

use crate::protocol::value::{
    decode_kv, encode_kv, read_length_prefixed_string, require_len, TypedValue,
};
use crate::protocol::ProtocolError;

/// Protocol version advertised in the HELLO response.
pub const SUPPORTED_VERSION: &str = "2.0";

/// Capability list advertised in the HELLO response.
pub const CAPABILITIES: &str = "pipelining";

/// A decoded NOTIFY message: a named event with typed arguments.
///
/// Keys are unique and argument order carries no meaning, so the arguments
/// are kept as a map.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyMessage {
    /// Application-assigned message name.
    pub name: String,
    /// Typed arguments keyed by name.
    pub args: HashMap<String, TypedValue>,
}

/// Decodes a NOTIFY payload into a [`NotifyMessage`].
///
/// # Errors
///
/// Returns [`ProtocolError`] if the payload is truncated at any point, a
/// declared length runs past the buffer, a name is not valid UTF-8, or an
/// argument carries an unknown value tag.  All of these are fatal to the
/// session; there is no per-message recovery.
pub fn decode_notify(payload: &[u8]) -> Result<NotifyMessage, ProtocolError> {
    let (name, mut offset) = read_length_prefixed_string(payload, 0)?;

    require_len(payload, offset + 2, "argument count")?;
    let arg_count = u16::from_be_bytes([payload[offset], payload[offset + 1]]) as usize;
    offset += 2;

    let mut args = HashMap::with_capacity(arg_count);
    for _ in 0..arg_count {
        let (key, value, next) = decode_kv(payload, offset)?;
        args.insert(key, value);
        offset = next;
    }

    Ok(NotifyMessage { name, args })
}

/// Builds the fixed HELLO response payload.
///
/// Exactly three key-value pairs, in this order: `"version"` (STR `"2.0"`),
/// `"max-frame-size"` (UINT32, the configured buffer size), `"capabilities"`
/// (STR `"pipelining"`).  Peers that parse positionally or log the raw
/// payload rely on this layout staying stable.
pub fn encode_hello_response(max_frame_size: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_kv(
        &mut buf,
        "version",
        &TypedValue::String(SUPPORTED_VERSION.to_string()),
    );
    encode_kv(&mut buf, "max-frame-size", &TypedValue::UInt32(max_frame_size));
    encode_kv(
        &mut buf,
        "capabilities",
        &TypedValue::String(CAPABILITIES.to_string()),
    );
    buf
}

/// Decodes a bare key-value list (the HELLO payload layout) in wire order.
///
/// Pairs are returned as a vector so callers can assert on ordering; the
/// HELLO handler only uses this for best-effort logging of the peer's
/// declared parameters.
///
/// # Errors
///
/// Same failure modes as [`decode_kv`].
pub fn decode_kv_list(payload: &[u8]) -> Result<Vec<(String, TypedValue)>, ProtocolError> {
    let mut pairs = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let (key, value, next) = decode_kv(payload, offset)?;
        pairs.push((key, value));
        offset = next;
    }
    Ok(pairs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
