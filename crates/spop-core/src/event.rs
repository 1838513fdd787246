//! Classified application events and their downstream JSON shape.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::protocol::message::NotifyMessage;
use crate::protocol::value::TypedValue;

/// Whether a NOTIFY message described an HTTP request or a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Request,
    Response,
}

impl EventKind {
    /// Classifies an argument map: a message is a request iff it carries an
    /// argument literally named `"method"`.
    ///
    /// This is a heuristic over application-supplied keys, not a protocol
    /// field — a peer that names an unrelated argument `"method"` will be
    /// classified as a request.
    pub fn classify(args: &HashMap<String, TypedValue>) -> Self {
        if args.contains_key("method") {
            EventKind::Request
        } else {
            EventKind::Response
        }
    }
}

/// One classified event extracted from a NOTIFY frame.
///
/// Serializes to the downstream sink's JSON body:
/// `{ "type": "request"|"response", "timestamp": <seconds since epoch>,
/// "data": { ... } }`.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Seconds since the Unix epoch at extraction time.
    pub timestamp: f64,
    /// The message's typed arguments, passed through unchanged.
    pub data: HashMap<String, TypedValue>,
}

impl Event {
    /// Builds an event from a decoded NOTIFY message, stamping the current
    /// system time.
    pub fn from_message(message: NotifyMessage) -> Self {
        let kind = EventKind::classify(&message.args);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self {
            kind,
            timestamp,
            data: message.args,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
