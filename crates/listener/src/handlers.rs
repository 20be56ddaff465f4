//! Request handlers for event intake and on-demand scans.
//!
//! Each request runs in its own `tracing` span tagged with a generated
//! request id; all logging for the request happens inside that span.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::Method;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;
use validation::{
    classify, ClassifiedAction, DigestHex, ImageDigest, RequestError, ScanScope,
    SeverityThreshold, ValidationError, Verification, WorkspaceError, WorkspaceHandle,
};

use crate::envelope::decode_notification;
use crate::response::ApiResponse;
use crate::server::AppState;

/// Query parameter carrying the image digest reference.
pub const DIGEST_PARAM: &str = "digest";

const MESSAGE_SCANNED: &str = "image scanned";
const MESSAGE_SIGNATURE_VERIFIED: &str = "signature verified";
const MESSAGE_ATTESTATION_VERIFIED: &str = "attestation verified";

// ---------------------------------------------------------------------------
// Event intake
// ---------------------------------------------------------------------------

/// `POST /event` — registry notification intake.
///
/// Always answers `200 OK`. Failures are logged and reported in the body but
/// never surfaced as a transport error, so the messaging platform does not
/// redeliver.
pub async fn event_handler(State(state): State<AppState>, method: Method, body: Bytes) -> ApiResponse {
    let span = tracing::info_span!("event", request_id = %Uuid::new_v4());
    async move {
        tracing::info!("processing event");
        match process_event(&state, &method, &body).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(kind = err.kind(), error = %err, "error processing event");
                ApiResponse::error(&err)
            }
        }
    }
    .instrument(span)
    .await
}

async fn process_event(
    state: &AppState,
    method: &Method,
    body: &[u8],
) -> Result<ApiResponse, ValidationError> {
    require_post(method)?;
    let notification = decode_notification(body)?;
    tracing::debug!(
        message_id = ?notification.message_id,
        publish_time = ?notification.publish_time,
        subscription = ?notification.subscription,
        "notification decoded"
    );

    let event = &notification.event;
    let action = classify(event);
    tracing::info!(
        event_action = %event.action,
        digest = ?event.digest(),
        tag = ?event.tag(),
        classified = action.name(),
        "event classified"
    );

    match action {
        ClassifiedAction::Ignore(reason) => {
            tracing::info!(reason = %reason, "event ignored");
            Ok(ApiResponse::image(
                event.digest().unwrap_or_default(),
                format!("event ignored: {reason}"),
            ))
        }
        ClassifiedAction::ScanImage(digest) => {
            run_scan(
                state,
                &digest,
                &SeverityThreshold::default(),
                &ScanScope::default(),
            )
            .await?;
            Ok(ApiResponse::image(digest.as_str(), MESSAGE_SCANNED))
        }
        ClassifiedAction::VerifySignature(digest) => {
            run_verification(state, Verification::Signature, &digest).await?;
            Ok(ApiResponse::image(digest.as_str(), MESSAGE_SIGNATURE_VERIFIED))
        }
        ClassifiedAction::VerifyAttestation(digest) => {
            run_verification(state, Verification::Attestation, &digest).await?;
            Ok(ApiResponse::image(digest.as_str(), MESSAGE_ATTESTATION_VERIFIED))
        }
    }
}

// ---------------------------------------------------------------------------
// On-demand scan
// ---------------------------------------------------------------------------

/// Query parameters of `POST /scan`. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanParams {
    pub digest: Option<String>,
    pub severity: Option<String>,
    pub scope: Option<String>,
}

/// `POST /scan?digest=...&severity=...&scope=...` — synchronous image scan.
///
/// Every failure is reported in the body.
pub async fn scan_handler(
    State(state): State<AppState>,
    method: Method,
    params: Option<Query<ScanParams>>,
) -> ApiResponse {
    let span = tracing::info_span!("scan", request_id = %Uuid::new_v4());
    async move {
        tracing::info!("processing scan request");
        let params = params.map(|Query(p)| p).unwrap_or_default();
        match process_scan(&state, &method, params).await {
            Ok(digest) => ApiResponse::image(digest.as_str(), MESSAGE_SCANNED),
            Err(err) => {
                tracing::error!(kind = err.kind(), error = %err, "error processing scan request");
                ApiResponse::error(&err)
            }
        }
    }
    .instrument(span)
    .await
}

async fn process_scan(
    state: &AppState,
    method: &Method,
    params: ScanParams,
) -> Result<ImageDigest, ValidationError> {
    require_post(method)?;

    let digest = params
        .digest
        .filter(|d| !d.is_empty())
        .ok_or(RequestError::MissingParameter { name: DIGEST_PARAM })?;
    let severity = params
        .severity
        .and_then(SeverityThreshold::new)
        .unwrap_or_default();
    let scope = params.scope.and_then(ScanScope::new).unwrap_or_default();

    let digest = ImageDigest::parse(&digest)?;
    run_scan(state, &digest, &severity, &scope).await?;
    Ok(digest)
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// Shared dispatch
// ---------------------------------------------------------------------------

fn require_post(method: &Method) -> Result<(), RequestError> {
    if *method == Method::POST {
        Ok(())
    } else {
        Err(RequestError::MethodNotAllowed {
            method: method.to_string(),
            expected: "POST",
        })
    }
}

/// Scans `digest` inside a fresh workspace. The workspace is removed on every
/// exit path, including a failed or cancelled command.
async fn run_scan(
    state: &AppState,
    digest: &ImageDigest,
    severity: &SeverityThreshold,
    scope: &ScanScope,
) -> Result<(), ValidationError> {
    let workspace = acquire_workspace(state, digest.hex()).await?;
    tracing::info!(
        digest = %digest,
        severity = %severity,
        scope = %scope,
        workspace = %workspace.path().display(),
        "scanning image"
    );

    let args = state
        .commands
        .scan_args(digest, severity, scope, workspace.path());
    let result = state.runner.run(&state.execution_context(), &args).await;
    release_workspace(workspace).await;
    result.map_err(ValidationError::from)
}

/// Creates the workspace on a blocking thread.
async fn acquire_workspace(
    state: &AppState,
    digest: &DigestHex,
) -> Result<WorkspaceHandle, WorkspaceError> {
    let store = state.workspaces.clone();
    let digest = digest.clone();
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| WorkspaceHandle::acquire(store, &digest)))
        .await
        .map_err(|err| WorkspaceError::Task {
            reason: err.to_string(),
        })?
}

/// Removes the workspace on a blocking thread. Removal failures are logged by
/// the handle itself.
async fn release_workspace(workspace: WorkspaceHandle) {
    let span = tracing::Span::current();
    if let Err(err) = tokio::task::spawn_blocking(move || span.in_scope(|| workspace.release())).await {
        tracing::warn!(error = %err, "workspace release task failed");
    }
}

async fn run_verification(
    state: &AppState,
    verification: Verification,
    digest: &ImageDigest,
) -> Result<(), ValidationError> {
    tracing::info!(digest = %digest, verification = ?verification, "verifying image");
    let args = state.commands.verify_args(verification, digest);
    state.runner.run(&state.execution_context(), &args).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_post_is_accepted() {
        assert!(require_post(&Method::POST).is_ok());
        let err = require_post(&Method::GET).unwrap_err();
        assert_eq!(err.to_string(), "method GET not supported, expected POST");
    }
}
