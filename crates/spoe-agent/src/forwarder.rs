//! Fire-and-forget delivery of decoded events to the downstream HTTP sink.
//!
//! The protocol session must never wait on the sink: `dispatch` submits the
//! event to its own Tokio task and returns immediately, so the ACK to the
//! peer is not ordered with respect to forward completion.  Delivery is
//! best-effort — a failed or timed-out POST is logged and the event is gone.
//!
//! In-flight forwards are bounded by a semaphore.  When the sink stalls and
//! all permits are held, new events are dropped and counted instead of
//! accumulating tasks without limit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use spop_core::Event;

/// Timeout applied to each downstream POST, connection setup included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Asynchronous dispatcher for decoded events.
///
/// One instance is shared by all sessions; the underlying `reqwest::Client`
/// pools connections to the sink across them.
pub struct DownstreamForwarder {
    client: reqwest::Client,
    url: String,
    permits: Arc<Semaphore>,
    dropped: AtomicU64,
}

impl DownstreamForwarder {
    /// Creates a forwarder targeting `url` with at most `max_in_flight`
    /// concurrent deliveries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g. the
    /// TLS backend fails to initialize).
    pub fn new(url: String, max_in_flight: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build downstream HTTP client")?;

        Ok(Self {
            client,
            url,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            dropped: AtomicU64::new(0),
        })
    }

    /// Submits an event for delivery and returns without waiting.
    ///
    /// If all in-flight permits are taken the event is dropped immediately:
    /// the wire protocol offers the peer no backpressure signal, so queueing
    /// here would only disguise a stalled sink as unbounded memory growth.
    pub fn dispatch(self: &Arc<Self>, event: Event) {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "downstream forwarding saturated; dropping event");
                return;
            }
        };

        let forwarder = Arc::clone(self);
        tokio::spawn(async move {
            forwarder.post(event).await;
            drop(permit);
        });
    }

    /// Total number of events dropped because the in-flight bound was hit.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    async fn post(&self, event: Event) {
        let kind = event.kind;
        match self.client.post(&self.url).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                info!(?kind, "sent event to downstream processor");
            }
            Ok(response) => {
                warn!(status = %response.status(), "downstream processor rejected event");
            }
            Err(e) => {
                warn!("failed to send to downstream: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use spop_core::EventKind;
    use std::collections::HashMap;

    fn make_event() -> Event {
        Event {
            kind: EventKind::Response,
            timestamp: 1.0,
            data: HashMap::new(),
        }
    }

    #[test]
    fn test_new_forwarder_starts_with_zero_drops() {
        let forwarder = DownstreamForwarder::new("http://127.0.0.1:1/x".to_string(), 4).unwrap();
        assert_eq!(forwarder.dropped_events(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_with_zero_permits_drops_immediately() {
        // A zero-permit forwarder can never deliver; every dispatch must be
        // counted as a drop and must not spawn a task.
        let forwarder =
            Arc::new(DownstreamForwarder::new("http://127.0.0.1:1/x".to_string(), 0).unwrap());

        forwarder.dispatch(make_event());
        forwarder.dispatch(make_event());

        assert_eq!(forwarder.dropped_events(), 2);
    }
}
