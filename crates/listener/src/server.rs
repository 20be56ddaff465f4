//! Router construction and serving.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use validation::{CancelSource, CommandRunner, CommandSet, ExecutionContext, WorkspaceStore};

use crate::handlers::{event_handler, healthz, scan_handler};

/// Route of the registry notification intake endpoint.
pub const EVENT_ROUTE: &str = "/event";
/// Route of the on-demand scan endpoint.
pub const SCAN_ROUTE: &str = "/scan";
/// Route of the liveness endpoint.
pub const HEALTH_ROUTE: &str = "/healthz";

/// Collaborators shared by every request.
///
/// Nothing in here is mutated by a request; the only shared mutable resource
/// is the filesystem namespace behind `workspaces`.
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandSet>,
    pub runner: Arc<dyn CommandRunner>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub shutdown: CancelSource,
    pub command_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        commands: CommandSet,
        runner: Arc<dyn CommandRunner>,
        workspaces: Arc<dyn WorkspaceStore>,
    ) -> Self {
        Self {
            commands: Arc::new(commands),
            runner,
            workspaces,
            shutdown: CancelSource::new(),
            command_timeout: None,
        }
    }

    /// Bounds every command run by `timeout`.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Context for one command run: cancelled on server shutdown and bounded
    /// by the configured timeout.
    pub fn execution_context(&self) -> ExecutionContext {
        self.shutdown.context(self.command_timeout)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("commands", &self.commands)
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

/// Builds the application router.
///
/// Intake and scan accept every method at the routing layer so that a wrong
/// method is reported in the JSON body with `200 OK` rather than as `405`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(EVENT_ROUTE, any(event_handler))
        .route(SCAN_ROUTE, any(scan_handler))
        .route(HEALTH_ROUTE, get(healthz))
        .with_state(state)
}

/// Serves the application on `listener` until `shutdown` resolves.
///
/// When `shutdown` resolves, every in-flight command is cancelled (its
/// process killed) and the server drains open connections before returning.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = state.shutdown.clone();
    let app = router(state);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "regwatch listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown requested, cancelling in-flight commands");
            cancel.cancel();
        })
        .await
}
