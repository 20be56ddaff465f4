//! regwatch execution infrastructure.
//!
//! Implements the [`validation::CommandRunner`] and
//! [`validation::WorkspaceStore`] ports:
//!
//! - [`ProcessCommandRunner`] — spawns the configured scanner or verifier as
//!   a tokio child process, bounded by the request's
//!   [`validation::ExecutionContext`]. Cancellation, timeout, and dropping
//!   the request future all kill the child.
//! - [`FsWorkspaceStore`] — creates per-request directories under a
//!   configured root and removes them recursively.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process spawning and filesystem access live here. The
//! [`validation`] crate sees only its own traits.

pub mod runner;
pub mod workspace;

pub use runner::{ProcessCommandRunner, STDERR_TAIL_BYTES, STDOUT_TAIL_BYTES};
pub use workspace::FsWorkspaceStore;
