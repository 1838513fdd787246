//! SPOE event bridge agent — entry point.
//!
//! This binary speaks the binary stream-processing offload protocol over
//! TCP, decodes the request/response events carried inside NOTIFY frames,
//! and relays them as JSON to an external HTTP sink.
//!
//! # Usage
//!
//! ```text
//! spoe-agent [OPTIONS]
//!
//! Options:
//!   --listen-addr     <ADDR>  IP address to bind [default: 0.0.0.0]
//!   --listen-port     <PORT>  TCP port to listen on [default: 9000]
//!   --downstream-url  <URL>   Event sink endpoint
//!   --buffer-size     <BYTES> Read size / advertised max-frame-size [default: 16384]
//!   --max-in-flight   <N>     Concurrent downstream forwards bound [default: 64]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI arguments take precedence when both are present.
//!
//! | Variable          | Default                                        |
//! |-------------------|------------------------------------------------|
//! | `LISTEN_ADDR`     | `0.0.0.0`                                      |
//! | `LISTEN_PORT`     | `9000`                                         |
//! | `DOWNSTREAM_URL`  | `http://http-event-processor:8080/http-events` |
//! | `BUFFER_SIZE`     | `16384`                                        |
//! | `MAX_IN_FLIGHT`   | `64`                                           |

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spoe_agent::config::AgentConfig;
use spoe_agent::server::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Offload-protocol agent relaying decoded HTTP events to a downstream sink.
#[derive(Debug, Parser)]
#[command(
    name = "spoe-agent",
    about = "Binary-protocol agent that forwards decoded HTTP events to an HTTP sink",
    version
)]
struct Cli {
    /// IP address to bind the listener to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` for local-only deployments.
    #[arg(long, default_value = "0.0.0.0", env = "LISTEN_ADDR")]
    listen_addr: String,

    /// TCP port to listen on for proxy connections.
    #[arg(long, default_value_t = 9000, env = "LISTEN_PORT")]
    listen_port: u16,

    /// HTTP endpoint that receives decoded events as JSON.
    #[arg(
        long,
        default_value = "http://http-event-processor:8080/http-events",
        env = "DOWNSTREAM_URL"
    )]
    downstream_url: String,

    /// Socket read size in bytes.  Also advertised to peers as
    /// `max-frame-size` and enforced against inbound frame lengths.
    #[arg(long, default_value_t = 16384, env = "BUFFER_SIZE")]
    buffer_size: usize,

    /// Maximum concurrent downstream forwards before events are dropped.
    #[arg(long, default_value_t = 64, env = "MAX_IN_FLIGHT")]
    max_in_flight: usize,
}

impl Cli {
    /// Converts the parsed CLI arguments into an [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--listen-addr` is not a valid IP address.
    fn into_agent_config(self) -> anyhow::Result<AgentConfig> {
        let listen_addr: SocketAddr = format!("{}:{}", self.listen_addr, self.listen_port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid listen address: '{}:{}'",
                    self.listen_addr, self.listen_port
                )
            })?;

        Ok(AgentConfig {
            listen_addr,
            downstream_url: self.downstream_url,
            buffer_size: self.buffer_size,
            max_in_flight: self.max_in_flight,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_agent_config()?;

    info!(
        "SPOE agent starting — listen={}, downstream={}",
        config.listen_addr, config.downstream_url
    );

    // Shutdown flag shared with the accept loop; in-flight sessions are not
    // awaited, they drop with the process.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    run_server(config, running).await?;

    info!("SPOE agent stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
