//! TCP accept loop: one session task per accepted connection.
//!
//! The loop itself does no protocol work.  It accepts a socket, spawns a
//! session task for it, and immediately returns to accepting, so one slow
//! peer can never delay another.  The only state shared across sessions is
//! the read-only configuration and the forwarder's shared HTTP client.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info};

use crate::config::AgentConfig;
use crate::forwarder::DownstreamForwarder;
use crate::session::handle_connection;

/// Runs the main accept loop until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (port in use,
/// insufficient permissions) or the downstream HTTP client cannot be built.
/// Accept-time errors are logged and the loop continues.
pub async fn run_server(config: AgentConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;

    info!("agent listening on {}", config.listen_addr);

    let forwarder = Arc::new(DownstreamForwarder::new(
        config.downstream_url.clone(),
        config.max_in_flight,
    )?);
    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout on accept() so the loop can poll the shutdown flag
        // even when no peers are connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let cfg = Arc::clone(&config);
                let fwd = Arc::clone(&forwarder);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg, fwd).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept failure (e.g. file descriptor exhaustion).
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout — no connection in the last 200 ms.
            }
        }
    }

    Ok(())
}
