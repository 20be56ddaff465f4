//! regwatch event source infrastructure.
//!
//! Exposes the validation core over HTTP:
//!
//! - [`EVENT_ROUTE`] — receives registry change notifications pushed by the
//!   messaging platform, classifies them, and dispatches a scan or a
//!   signature/attestation verification. Always answers `200 OK`.
//! - [`SCAN_ROUTE`] — scans one image digest on demand and reports the
//!   outcome to the caller.
//! - [`HEALTH_ROUTE`] — liveness.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Envelope decoding, HTTP routing, and response
//! encoding live here. Classification and argument assembly come from
//! [`validation`]; process and filesystem access arrive through the
//! [`validation::CommandRunner`] and [`validation::WorkspaceStore`] held in
//! [`AppState`].

pub mod envelope;
pub mod handlers;
pub mod response;
pub mod server;

pub use envelope::{decode_notification, Notification, PushEnvelope, PushMessage};
pub use handlers::{event_handler, healthz, scan_handler, ScanParams};
pub use response::ApiResponse;
pub use server::{router, serve, AppState, EVENT_ROUTE, HEALTH_ROUTE, SCAN_ROUTE};
