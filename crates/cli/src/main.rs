//! regwatch entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — flags with environment fallbacks (see [`config::Config`]).
//! 2. **Wire observability** — install the `tracing-subscriber` JSON (or
//!    pretty) layer that every crate's spans and events flow through, plus
//!    the OTLP span exporter when an endpoint is configured.
//! 3. **Construct infrastructure** — a [`executor::ProcessCommandRunner`] and
//!    a [`executor::FsWorkspaceStore`], injected into [`listener::AppState`].
//! 4. **Serve** — bind the HTTP listener and run until Ctrl-C or SIGTERM,
//!    cancelling in-flight commands on shutdown.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use executor::{FsWorkspaceStore, ProcessCommandRunner};
use listener::AppState;
use tokio::net::TcpListener;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let _telemetry = telemetry::init_tracing(
        config.log_format,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    let commands = config.command_set()?;
    let workspaces = match &config.workspace_root {
        Some(root) => FsWorkspaceStore::new(root),
        None => FsWorkspaceStore::in_temp_dir(),
    };
    tracing::info!(
        scan = %commands.scan,
        signature = %commands.signature,
        attestation = %commands.attestation,
        workspace_root = %workspaces.root().display(),
        timeout_secs = config.command_timeout_secs,
        "starting regwatch"
    );

    let state = AppState::new(commands, Arc::new(ProcessCommandRunner::new()), Arc::new(workspaces))
        .with_command_timeout(config.command_timeout());

    let addr = config.socket_addr();
    let socket = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    listener::serve(socket, state, shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("regwatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
}
