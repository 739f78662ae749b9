//! agent-brain API server.
//!
//! Binds an HTTP server over the configured project's indexing and query
//! services. The CLI discovers a running server through the runtime
//! descriptor written into the project's state directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use agentbrain_api::{lifecycle, routes};

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    agentbrain_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let project_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(std::env::current_dir()?);

    info!(project_root = %project_root.display(), "starting agent-brain server");

    let (state, lock) = lifecycle::bootstrap(project_root).await?;
    let auto_port = state.config.server.auto_port;
    let host = state.config.server.host.clone();
    let configured_port = state.config.server.port;
    let worker_stop_timeout = Duration::from_secs(state.config.indexing.worker_stop_timeout_seconds);

    let worker = state.worker.clone();
    let worker_handle = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run().await }
    });

    let app = routes::create_router(state);

    let (listener, bound_addr) = bind_with_fallback(&host, configured_port, auto_port).await?;
    info!(addr = %bound_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down, stopping worker");
    worker.stop(worker_stop_timeout).await;
    let _ = worker_handle.await;
    lock.shutdown();

    Ok(())
}

async fn bind_with_fallback(host: &str, port: u16, auto_port: bool) -> AppResult<(TcpListener, SocketAddr)> {
    let max_attempts = if auto_port { 20 } else { 1 };
    for offset in 0..max_attempts {
        let candidate = port + offset;
        let addr: SocketAddr = format!("{host}:{candidate}").parse()?;
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, addr)),
            Err(err) if auto_port && offset + 1 < max_attempts => {
                warn!(port = candidate, error = %err, "port unavailable, trying next");
            }
            Err(err) => {
                error!(port = candidate, error = %err, "failed to bind");
                return Err(Box::new(err));
            }
        }
    }
    unreachable!("loop always returns or errors")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
}
