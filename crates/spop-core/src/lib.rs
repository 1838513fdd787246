//! # spop-core
//!
//! Shared library for the SPOE event bridge containing the binary frame
//! codec, the typed key-value codec, NOTIFY message parsing, and the
//! request/response event model.
//!
//! This crate is used by the agent binary and by integration tests.
//! It has zero dependencies on sockets, OS APIs, or HTTP clients.
//!
//! # Protocol overview
//!
//! Peers speak a length-delimited binary framing over TCP.  Every frame
//! carries an 8-byte header (type + stream id + payload length) followed by
//! the payload.  NOTIFY payloads contain a named message with a list of
//! typed key-value arguments; the agent classifies each message as a request
//! or a response and hands the result to the forwarding layer.
//!
//! - **`protocol::frame`** – packs and unpacks the 8-byte frame header and
//!   extracts payloads from a partially received byte stream.
//! - **`protocol::value`** – the self-describing typed value encoding
//!   (scalars, addresses, length-prefixed strings and blobs).
//! - **`protocol::message`** – NOTIFY payload parsing and the fixed HELLO
//!   response builder.
//! - **`event`** – the classified [`Event`] handed to the downstream
//!   forwarder, with its JSON wire shape.

pub mod event;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `spop_core::Frame` instead of `spop_core::protocol::frame::Frame`.
pub use event::{Event, EventKind};
pub use protocol::frame::{decode_frame, encode_frame, Frame, FrameType};
pub use protocol::message::NotifyMessage;
pub use protocol::value::TypedValue;
pub use protocol::ProtocolError;
