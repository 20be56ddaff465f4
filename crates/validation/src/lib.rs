//! Validation core for regwatch.
//!
//! This crate decides what to do with a container-registry change
//! notification: ignore it, scan the image, or verify a signature or
//! attestation. It also owns the contracts for running the chosen external
//! command and for staging its working directory. Infrastructure crates
//! implement those contracts; they never add classification rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `executor` defines *how* to supply it and
//! `listener` wires it to HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtypes (`DigestHex`, `TagLabel`, `SeverityThreshold`, etc.) |
//! | [`reference`] | Artifact reference parser (`ArtifactReference`, `ImageDigest`) |
//! | [`event`] | Decoded notification (`NotificationEvent`, `EventAction`) |
//! | [`classify`] | Event classifier and its tag rule table |
//! | [`command`] | External command prefixes and argument assembly |
//! | [`ports`] | `CommandRunner`, `WorkspaceStore`, `ExecutionContext`, `WorkspaceHandle` |
//! | [`errors`] | Error taxonomy |

pub mod classify;
pub mod command;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod ports;
pub mod reference;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use classify::{
    classify, classify_with, ClassifiedAction, IgnoreReason, TagRule, Verification, TAG_RULES,
};
pub use command::{CommandPrefix, CommandSet};
pub use errors::{CommandError, ReferenceError, RequestError, ValidationError, WorkspaceError};
pub use event::{EventAction, NotificationEvent};
pub use identifiers::{
    DigestHex, RegistryHost, RepositoryPath, ScanScope, SeverityThreshold, TagLabel,
};
pub use ports::{CancelSource, CommandRunner, ExecutionContext, WorkspaceHandle, WorkspaceStore};
pub use reference::{tag_label_of, ArtifactReference, ImageDigest, Locator};
