//! Agent configuration types.
//!
//! [`AgentConfig`] is the single source of truth for all runtime settings.
//! The binary populates it from CLI arguments and environment variables;
//! the domain and session code never read the environment directly, which
//! keeps every component easy to construct in tests.

use std::net::SocketAddr;

/// All runtime configuration for the agent.
///
/// Build this struct once at startup and wrap it in an `Arc` so it can be
/// shared cheaply across all session tasks.  Everything here is read-only
/// after startup; sessions share no other state.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The address and port the TCP listener binds to.
    pub listen_addr: SocketAddr,

    /// HTTP endpoint that receives decoded events as JSON.
    pub downstream_url: String,

    /// Socket read size in bytes.  Also advertised to peers as
    /// `max-frame-size` in the HELLO response and enforced as the upper
    /// bound on inbound frame payloads.
    pub buffer_size: usize,

    /// Maximum number of concurrently in-flight downstream forwards.
    /// Events arriving beyond this bound are dropped and counted rather
    /// than queued.
    pub max_in_flight: usize,
}

impl Default for AgentConfig {
    /// Returns an `AgentConfig` matching the standard deployment defaults.
    ///
    /// | Field           | Default                                          |
    /// |-----------------|--------------------------------------------------|
    /// | listen_addr     | `0.0.0.0:9000`                                   |
    /// | downstream_url  | `http://http-event-processor:8080/http-events`   |
    /// | buffer_size     | 16384                                            |
    /// | max_in_flight   | 64                                               |
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".parse().unwrap(),
            downstream_url: "http://http-event-processor:8080/http-events".to_string(),
            buffer_size: 16384,
            max_in_flight: 64,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
