//! Integration tests for downstream event delivery.
//!
//! A minimal HTTP/1.1 sink is run in-process: it accepts one POST at a time,
//! captures the raw request, and answers `200 OK`.  This exercises the real
//! `reqwest` path end to end — connection setup, headers, JSON body — without
//! any external service.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use spoe_agent::config::AgentConfig;
use spoe_agent::forwarder::DownstreamForwarder;
use spoe_agent::session::handle_connection;
use spop_core::protocol::value::encode_kv;
use spop_core::{encode_frame, Event, EventKind, FrameType, TypedValue};

const SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// One captured request: lowercased header block plus body.
struct CapturedRequest {
    headers: String,
    body: String,
}

/// Starts a minimal HTTP sink that answers every POST with `200 OK` and
/// pushes the captured request to the returned channel.
async fn start_http_sink() -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(captured) = serve_one_request(stream).await {
                    let _ = tx.send(captured).await;
                }
            });
        }
    });

    (addr, rx)
}

/// Reads one HTTP request (headers + content-length body), replies 200.
async fn serve_one_request(mut stream: TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    loop {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                (name.trim() == "content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() < body_start + content_length {
            continue;
        }

        let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();
        let _ = stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await;
        return Some(CapturedRequest { headers, body });
    }
}

fn make_event(kind: EventKind) -> Event {
    let mut data = HashMap::new();
    data.insert("status".to_string(), TypedValue::UInt32(200));
    Event {
        kind,
        timestamp: 1700000000.25,
        data,
    }
}

// ── Forwarder-level tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_forwarded_event_is_posted_as_json() {
    let (sink_addr, mut rx) = start_http_sink().await;
    let forwarder = Arc::new(
        DownstreamForwarder::new(format!("http://{sink_addr}/http-events"), 4).unwrap(),
    );

    forwarder.dispatch(make_event(EventKind::Response));

    let captured = timeout(SINK_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for the sink")
        .expect("sink channel closed");

    assert!(captured.headers.contains("content-type: application/json"));

    let json: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(json["type"], "response");
    assert_eq!(json["timestamp"], 1700000000.25);
    assert_eq!(json["data"]["status"], 200);
}

#[tokio::test]
async fn test_saturated_forwarder_drops_and_counts() {
    // A sink that accepts but never replies: the first dispatch holds its
    // permit for the full request timeout.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sink_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let forwarder =
        Arc::new(DownstreamForwarder::new(format!("http://{sink_addr}/e"), 1).unwrap());

    forwarder.dispatch(make_event(EventKind::Request));
    // The permit was taken synchronously above, so this one must drop.
    forwarder.dispatch(make_event(EventKind::Request));

    assert_eq!(forwarder.dropped_events(), 1);
}

// ── Full-path test: NOTIFY frame in, JSON event out ───────────────────────────

#[tokio::test]
async fn test_notify_frame_reaches_sink_as_classified_event() {
    let (sink_addr, mut rx) = start_http_sink().await;

    let config = Arc::new(AgentConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        downstream_url: format!("http://{sink_addr}/http-events"),
        buffer_size: 16384,
        max_in_flight: 8,
    });
    let forwarder = Arc::new(
        DownstreamForwarder::new(config.downstream_url.clone(), config.max_in_flight).unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let agent_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, peer_addr)) = listener.accept().await {
            let cfg = Arc::clone(&config);
            let fwd = Arc::clone(&forwarder);
            tokio::spawn(async move {
                handle_connection(stream, peer_addr, cfg, fwd).await;
            });
        }
    });

    // Drive one NOTIFY through the agent.
    let mut payload = Vec::new();
    payload.extend_from_slice(&8u32.to_be_bytes());
    payload.extend_from_slice(b"http-req");
    payload.extend_from_slice(&2u16.to_be_bytes());
    encode_kv(
        &mut payload,
        "method",
        &TypedValue::String("GET".to_string()),
    );
    encode_kv(
        &mut payload,
        "path",
        &TypedValue::String("/orders".to_string()),
    );

    let mut client = TcpStream::connect(agent_addr).await.unwrap();
    client
        .write_all(&encode_frame(FrameType::Notify as u8, 1, &payload))
        .await
        .unwrap();

    // The ACK must arrive regardless of sink progress.
    let mut ack_header = [0u8; 8];
    timeout(SINK_TIMEOUT, client.read_exact(&mut ack_header))
        .await
        .expect("timed out waiting for the ACK")
        .unwrap();

    // And the classified event must land at the sink.
    let captured = timeout(SINK_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for the sink")
        .expect("sink channel closed");

    let json: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(json["type"], "request");
    assert_eq!(json["data"]["method"], "GET");
    assert_eq!(json["data"]["path"], "/orders");
    assert!(json["timestamp"].is_f64());
}
