//! Per-connection protocol session: byte-stream assembly and frame dispatch.
//!
//! TCP is a stream protocol: a single `read()` may return less than one
//! complete frame, or several frames at once.  Each session owns an
//! accumulation buffer; newly read bytes are appended and complete frames
//! are drained off the front one at a time.  An incomplete frame is never
//! discarded — the loop simply reads more.
//!
//! Within a session, frames are handled strictly in wire order: the ACK for
//! frame N is written before frame N+1 is examined.  Downstream forwarding
//! is the one exception to the synchronous flow — events are submitted to
//! the forwarder without waiting, so the peer never stalls on the sink.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use spop_core::{decode_frame, encode_frame, FrameType, ProtocolError};

use crate::config::AgentConfig;
use crate::forwarder::DownstreamForwarder;
use crate::handlers::{dispatch_frame, FrameOutcome};

/// Error type for a single protocol session.
///
/// Every variant is fatal to the session and only to the session: the
/// connection is closed, the peer owns reconnection, and the accept loop is
/// unaffected.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The socket read or write failed, or the peer reset the connection.
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A frame or payload could not be decoded.  One corrupt frame ends the
    /// connection; there is no per-frame recovery.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Top-level handler for one accepted connection.
///
/// Wraps [`run_session`] and logs the outcome.  This is the entry point for
/// the per-connection task spawned by the accept loop; using an outer/inner
/// pair keeps `?` propagation clean inside the session itself.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<AgentConfig>,
    forwarder: Arc<DownstreamForwarder>,
) {
    info!("new connection from {peer_addr}");
    match run_session(stream, peer_addr, config, forwarder).await {
        Ok(()) => info!("connection from {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e}"),
    }
}

/// Runs the frame-assembly and dispatch loop for one connection.
///
/// Returns `Ok(())` on a clean end of session: the peer closed the socket or
/// sent DISCONNECT.  DISCONNECT is not acknowledged — the connection is
/// simply closed.
///
/// # Errors
///
/// Returns [`SessionError`] on socket I/O failure or on any decode/handler
/// error; the caller logs it and the connection drops with no response to
/// the offending frame.
pub async fn run_session(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<AgentConfig>,
    forwarder: Arc<DownstreamForwarder>,
) -> Result<(), SessionError> {
    // Accumulates bytes across reads until complete frames can be drained.
    let mut recv_buf: Vec<u8> = Vec::with_capacity(config.buffer_size);
    // Scratch buffer for each individual read() call.
    let mut read_tmp = vec![0u8; config.buffer_size];

    loop {
        let n = stream.read(&mut read_tmp).await?;
        if n == 0 {
            debug!("session {peer_addr}: peer closed the connection");
            return Ok(());
        }
        recv_buf.extend_from_slice(&read_tmp[..n]);

        // Drain every complete frame already buffered before blocking on the
        // socket again — one read may have delivered several frames.
        loop {
            let (frame, consumed) = match decode_frame(&recv_buf, config.buffer_size) {
                Ok(decoded) => decoded,
                Err(ProtocolError::InsufficientData { .. }) => break,
                Err(e) => return Err(e.into()),
            };
            recv_buf.drain(..consumed);

            debug!(
                frame_type = frame.frame_type,
                stream_id = frame.stream_id,
                len = frame.payload.len(),
                "session {peer_addr}: frame assembled"
            );

            match dispatch_frame(&frame, config.buffer_size as u32)? {
                FrameOutcome::Terminate => {
                    debug!("session {peer_addr}: DISCONNECT received; closing");
                    return Ok(());
                }
                FrameOutcome::Ack { payload, event } => {
                    // Submit before the ACK write, but never wait: forward
                    // completion and ACK delivery are deliberately unordered.
                    if let Some(event) = event {
                        forwarder.dispatch(event);
                    }

                    let ack = encode_frame(FrameType::Ack as u8, frame.stream_id, &payload);
                    stream.write_all(&ack).await?;
                }
            }
        }
    }
}
