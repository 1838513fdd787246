//! Frame dispatch: the protocol-level reaction to each inbound frame type.
//!
//! Every handler is a pure function of the frame payload plus configuration.
//! Nothing here touches a socket; the session loop owns all I/O, which keeps
//! the protocol logic directly testable against byte buffers.

use spop_core::protocol::message::{decode_kv_list, decode_notify, encode_hello_response};
use spop_core::{Event, Frame, FrameType, ProtocolError};
use tracing::{debug, warn};

/// What the session loop should do after one frame has been handled.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Write an ACK frame carrying `payload` back to the peer, submitting
    /// `event` for downstream forwarding first if one was extracted.
    Ack {
        payload: Vec<u8>,
        event: Option<Event>,
    },
    /// Stop processing frames and close the connection without a response.
    Terminate,
}

/// Handles a HELLO frame: always answers with the fixed capability payload.
///
/// The peer's declared parameters are not negotiated — an unsupported
/// version is not rejected here, matching the deployed peers' expectations.
/// They are decoded on a best-effort basis for debug logging only; a payload
/// that fails to parse does not affect the response.
pub fn handle_hello(payload: &[u8], max_frame_size: u32) -> Vec<u8> {
    match decode_kv_list(payload) {
        Ok(params) => debug!(?params, "HELLO parameters from peer"),
        Err(e) => debug!("unparseable HELLO parameters: {e}"),
    }
    encode_hello_response(max_frame_size)
}

/// Handles a NOTIFY frame: extracts and classifies the event.
///
/// Returns the ACK payload (always empty — the acknowledgment carries no
/// action data back to the peer) together with the decoded [`Event`] for
/// forwarding.
///
/// # Errors
///
/// Propagates any [`ProtocolError`] from payload decoding; the caller treats
/// it as fatal for the session.
pub fn handle_notify(payload: &[u8]) -> Result<(Vec<u8>, Event), ProtocolError> {
    let message = decode_notify(payload)?;
    debug!(
        name = %message.name,
        args = message.args.len(),
        "decoded NOTIFY message"
    );
    let event = Event::from_message(message);
    Ok((Vec::new(), event))
}

/// Routes one decoded frame to its handler.
///
/// DISCONNECT yields [`FrameOutcome::Terminate`]; frames with an
/// unrecognized type code (including inbound ACKs, which this agent never
/// solicits data for) are acknowledged with an empty payload and the session
/// continues.  The permissive treatment of unknown types is logged so wire
/// drift stays visible.
pub fn dispatch_frame(frame: &Frame, max_frame_size: u32) -> Result<FrameOutcome, ProtocolError> {
    match FrameType::try_from(frame.frame_type) {
        Ok(FrameType::Hello) => Ok(FrameOutcome::Ack {
            payload: handle_hello(&frame.payload, max_frame_size),
            event: None,
        }),
        Ok(FrameType::Notify) => {
            let (payload, event) = handle_notify(&frame.payload)?;
            Ok(FrameOutcome::Ack {
                payload,
                event: Some(event),
            })
        }
        Ok(FrameType::Disconnect) => Ok(FrameOutcome::Terminate),
        Ok(FrameType::Ack) | Err(()) => {
            warn!(
                frame_type = frame.frame_type,
                stream_id = frame.stream_id,
                "ignoring frame with unhandled type"
            );
            Ok(FrameOutcome::Ack {
                payload: Vec::new(),
                event: None,
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
