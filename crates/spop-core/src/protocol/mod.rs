//! Protocol module containing the frame codec, the typed value codec, and
//! message-level payload parsing.

pub mod frame;
pub mod message;
pub mod value;

use thiserror::Error;

pub use frame::{decode_frame, encode_frame, Frame, FrameType};
pub use message::{decode_notify, encode_hello_response, NotifyMessage};
pub use value::{decode_kv, encode_kv, TypedValue};

/// Errors that can occur while decoding frames or payloads.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte stream does not yet hold a complete frame.
    ///
    /// This is not a failure: the caller should read more bytes from the
    /// socket and retry.  It is only ever returned by [`decode_frame`];
    /// payload-level decoders report truncation as [`MalformedPayload`],
    /// which is fatal, because a payload is decoded only once its frame is
    /// fully buffered.
    ///
    /// [`MalformedPayload`]: ProtocolError::MalformedPayload
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The header declares a payload larger than the negotiated frame size.
    #[error("frame length {declared} exceeds the {limit}-byte frame size limit")]
    FrameTooLarge { declared: usize, limit: usize },

    /// The tag byte of a typed value is not one of the ten known codes.
    #[error("unknown typed-value tag: 0x{0:02X}")]
    UnknownDataType(u8),

    /// The payload could not be parsed (truncated field, length running past
    /// the buffer, invalid UTF-8, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
