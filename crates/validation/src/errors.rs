//! Error taxonomy for the validation core.
//!
//! Every failure is an explicit value with a stable [`kind`](ValidationError::kind)
//! and the contextual fields needed to log it. Nothing here decides how an
//! error reaches the caller; the request handlers in the `listener` crate
//! choose between reporting (on-demand scan) and logging only (event intake).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Reference parsing
// ---------------------------------------------------------------------------

/// A malformed artifact reference.
///
/// Recoverable: the event classifier turns it into an ignored event, the
/// on-demand scan endpoint reports it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The reference matches neither `host/path@sha256:<hex>` nor `host/path:<label>`,
    /// or one of its components is empty or malformed.
    #[error("invalid artifact reference '{reference}': {reason}")]
    InvalidFormat {
        /// The reference as received.
        reference: String,
        /// Which part of the shape check failed.
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Failure creating or removing a per-request workspace directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The directory could not be created (permissions, disk full, path too long).
    #[error("failed to create workspace {}: {source}", .path.display())]
    Create {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The blocking task doing the filesystem work panicked or was cancelled.
    #[error("workspace task failed: {reason}")]
    Task {
        /// Rendered join failure.
        reason: String,
    },

    /// The directory could not be removed. Logged only; never fails a request.
    #[error("failed to remove workspace {}: {source}", .path.display())]
    Remove {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// External command
// ---------------------------------------------------------------------------

/// Failure of an external validation command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The argument list was empty; there is no program to run.
    #[error("command is empty")]
    EmptyCommand,

    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the running process failed.
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status.
    ///
    /// `exit_code` is `-1` when the process was terminated by a signal.
    #[error("command exited with code {exit_code}: {stderr_tail}")]
    NonZeroExit {
        /// Process exit code.
        exit_code: i32,
        /// Trailing portion of the process's standard error.
        stderr_tail: String,
    },

    /// The execution context was cancelled before the process completed.
    /// The process has been killed.
    #[error("command cancelled")]
    Cancelled,

    /// The execution context's deadline elapsed before the process completed.
    /// The process has been killed.
    #[error("command timed out after {}s", .timeout.as_secs())]
    TimedOut {
        /// Deadline that elapsed.
        timeout: Duration,
    },
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

/// A request that is malformed before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The HTTP method is not the one the endpoint expects.
    #[error("method {method} not supported, expected {expected}")]
    MethodNotAllowed {
        /// Method received.
        method: String,
        /// Method expected.
        expected: &'static str,
    },

    /// A required query parameter is absent or empty.
    #[error("{name} parameter not set")]
    MissingParameter {
        /// Parameter name.
        name: &'static str,
    },

    /// The notification body could not be decoded into an event.
    #[error("invalid notification: {reason}")]
    InvalidNotification {
        /// Decoder failure description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Umbrella
// ---------------------------------------------------------------------------

/// Any failure of a validation request.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("error parsing digest: {0}")]
    Reference(#[from] ReferenceError),

    #[error("error creating workspace: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("error executing validation: {0}")]
    Command(#[from] CommandError),
}

impl ValidationError {
    /// Stable short name of the error kind, for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Reference(_) => "parse",
            Self::Workspace(_) => "io",
            Self::Command(CommandError::Cancelled | CommandError::TimedOut { .. }) => {
                "command_cancelled"
            }
            Self::Command(_) => "command",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ValidationError::from(RequestError::MissingParameter { name: "digest" });
        assert_eq!(err.to_string(), "digest parameter not set");
        assert_eq!(err.kind(), "request");

        let err = ValidationError::from(CommandError::NonZeroExit {
            exit_code: 3,
            stderr_tail: "boom".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "error executing validation: command exited with code 3: boom"
        );
        assert_eq!(err.kind(), "command");
    }

    #[test]
    fn cancellation_and_timeout_share_a_kind() {
        let cancelled = ValidationError::from(CommandError::Cancelled);
        let timed_out = ValidationError::from(CommandError::TimedOut {
            timeout: Duration::from_secs(5),
        });
        assert_eq!(cancelled.kind(), "command_cancelled");
        assert_eq!(timed_out.kind(), "command_cancelled");
        assert_eq!(
            timed_out.to_string(),
            "error executing validation: command timed out after 5s"
        );
    }

    #[test]
    fn workspace_error_displays_path() {
        let err = WorkspaceError::Create {
            path: PathBuf::from("/tmp/abc"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to create workspace /tmp/abc: denied");
    }
}
