//! RelayGate - integration gateway server
//!
//! Loads configuration, opens the database and serves the HTTP routes
//! until ctrl-c or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use relaygate_api::{build_router, AppContext};
use relaygate_domain::constants::OAUTH_STATE_PURGE_INTERVAL_SECS;
use relaygate_infra::config;
use relaygate_infra::init_tracing;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize tracing")?;

    let bind_address = config.server.bind_address.clone();
    let ctx = Arc::new(AppContext::new(config).context("failed to build application context")?);
    let purge = ctx.spawn_state_purge(Duration::from_secs(OAUTH_STATE_PURGE_INTERVAL_SECS));

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(address = %bind_address, "server.listening");

    axum::serve(listener, build_router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    purge.abort();
    info!("server.stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "signal.ctrl_c.unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "signal.sigterm.unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("server.shutdown_requested");
}
