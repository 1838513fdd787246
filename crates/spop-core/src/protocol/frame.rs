//! Frame-level codec for the binary stream-processing offload protocol.
//!
//! Wire format:
//! ```text
//! [frame_id:4][frame_len:4][payload:N]
//! ```
//! Total header size: 8 bytes.  Both header words are big-endian.  The frame
//! type occupies the top 4 bits of `frame_id` and the stream id the low 28.
//! `frame_len` is authoritative, not a delimiter: a frame is actionable only
//! once the full payload is available in the input buffer.

use crate::protocol::ProtocolError;

/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// The stream id occupies the low 28 bits of the frame identifier word.
pub const STREAM_ID_MASK: u32 = 0x0FFF_FFFF;

/// Frame type codes understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Hello = 1,
    Notify = 2,
    Ack = 3,
    Disconnect = 4,
}

impl TryFrom<u8> for FrameType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameType::Hello),
            2 => Ok(FrameType::Notify),
            3 => Ok(FrameType::Ack),
            4 => Ok(FrameType::Disconnect),
            _ => Err(()),
        }
    }
}

/// One length-delimited unit of the wire protocol.
///
/// `frame_type` is kept as the raw 4-bit code rather than a [`FrameType`]:
/// frames with unrecognized type codes are still acknowledged with their
/// stream id echoed back, so the code must survive decoding unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw 4-bit frame type code from the header.
    pub frame_type: u8,
    /// Peer-assigned correlation identifier, echoed back in the ACK.
    pub stream_id: u32,
    /// Frame payload; interpretation depends on the frame type.
    pub payload: Vec<u8>,
}

/// Encodes a frame header plus payload into a byte vector.
///
/// `frame_type` is masked to 4 bits and `stream_id` to 28, matching the
/// packing `frame_id = (frame_type << 28) | stream_id`.
///
/// # Examples
///
/// ```rust
/// use spop_core::protocol::frame::{decode_frame, encode_frame, FrameType};
///
/// let bytes = encode_frame(FrameType::Ack as u8, 7, b"");
/// let (frame, consumed) = decode_frame(&bytes, 16384).unwrap();
/// assert_eq!(frame.frame_type, FrameType::Ack as u8);
/// assert_eq!(frame.stream_id, 7);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_frame(frame_type: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let frame_id = (u32::from(frame_type & 0x0F) << 28) | (stream_id & STREAM_ID_MASK);

    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&frame_id.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns the frame and the total number of bytes consumed (header +
/// payload) so the caller can advance its read cursor.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if fewer than 8 header bytes, or
///   fewer than `8 + frame_len` bytes, are available.  The caller should
///   read more from the socket and retry with the grown buffer.
/// - [`ProtocolError::FrameTooLarge`] if the declared payload length exceeds
///   `max_frame_size`.  A peer announcing such a frame is violating the
///   negotiated limit and the connection should be dropped.
pub fn decode_frame(bytes: &[u8], max_frame_size: usize) -> Result<(Frame, usize), ProtocolError> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: FRAME_HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let frame_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let frame_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

    if frame_len > max_frame_size {
        return Err(ProtocolError::FrameTooLarge {
            declared: frame_len,
            limit: max_frame_size,
        });
    }

    let total_needed = FRAME_HEADER_SIZE + frame_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }

    Ok((
        Frame {
            frame_type: (frame_id >> 28) as u8,
            stream_id: frame_id & STREAM_ID_MASK,
            payload: bytes[FRAME_HEADER_SIZE..total_needed].to_vec(),
        },
        total_needed,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
