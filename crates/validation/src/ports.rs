//! Port traits implemented by infrastructure crates.
//!
//! The core never spawns a process or touches the filesystem itself. It asks
//! a [`CommandRunner`] to execute a command and a [`WorkspaceStore`] to create
//! and remove directories, so tests can substitute fakes for both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{CommandError, DigestHex, WorkspaceError};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Owner of a cancellation signal shared by any number of [`ExecutionContext`]s.
///
/// The server holds one for its lifetime and cancels it on shutdown, which
/// stops every in-flight command.
#[derive(Debug, Clone)]
pub struct CancelSource {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancels every context derived from this source. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Derives a context bounded by this source and an optional timeout.
    pub fn context(&self, timeout: Option<Duration>) -> ExecutionContext {
        ExecutionContext {
            timeout,
            cancel: Some(self.tx.subscribe()),
        }
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellable execution bounds for one command run.
///
/// A context is cancelled when its [`CancelSource`] is cancelled; its
/// timeout, if any, is enforced by the [`CommandRunner`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl ExecutionContext {
    /// A context that is never cancelled and has no timeout.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `timeout` applied.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled. Never resolves for a context
    /// without a source, or whose source was dropped uncancelled.
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.cancel {
            let mut rx = rx.clone();
            let cancelled = rx.wait_for(|cancelled| *cancelled).await.is_ok();
            if cancelled {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

/// Executes an external validation command.
///
/// `args[0]` is the program; the rest are its arguments, in order.
/// Implementations perform no retries and must terminate the process when
/// `ctx` is cancelled or times out.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// - [`CommandError::EmptyCommand`] if `args` is empty.
    /// - [`CommandError::NonZeroExit`] if the process exits non-zero.
    /// - [`CommandError::Cancelled`] / [`CommandError::TimedOut`] if `ctx`
    ///   ends first.
    async fn run(&self, ctx: &ExecutionContext, args: &[String]) -> Result<(), CommandError>;
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

/// Creates and removes per-request working directories.
pub trait WorkspaceStore: Send + Sync {
    /// Creates a fresh directory whose name is derived from `digest`.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::Create`] if the directory cannot be created.
    fn create(&self, digest: &DigestHex) -> Result<PathBuf, WorkspaceError>;

    /// Removes `path` and everything under it.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::Remove`] if removal fails.
    fn remove(&self, path: &Path) -> Result<(), WorkspaceError>;
}

/// Exclusively owned workspace directory, removed when the handle is dropped.
///
/// Removal happens exactly once on every exit path of the owner (normal
/// return, early `?` return, or unwind). Removal failures are logged and
/// never propagated.
pub struct WorkspaceHandle {
    path: PathBuf,
    store: Arc<dyn WorkspaceStore>,
}

impl WorkspaceHandle {
    /// Creates a workspace for `digest` in `store`.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::Create`] from the store.
    pub fn acquire(store: Arc<dyn WorkspaceStore>, digest: &DigestHex) -> Result<Self, WorkspaceError> {
        let path = store.create(digest)?;
        tracing::debug!(workspace = %path.display(), digest = %digest, "workspace acquired");
        Ok(Self { path, store })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the workspace now rather than at end of scope.
    pub fn release(self) {}
}

/// Removal in `drop` is synchronous and runs on the dropping thread. Async
/// callers should move the handle onto a blocking thread and call
/// [`WorkspaceHandle::release`] there; `drop` only does the work itself when
/// the owning future is abandoned.
impl Drop for WorkspaceHandle {
    fn drop(&mut self) {
        match self.store.remove(&self.path) {
            Ok(()) => tracing::debug!(workspace = %self.path.display(), "workspace released"),
            Err(err) => tracing::warn!(
                workspace = %self.path.display(),
                error = %err,
                "error deleting workspace"
            ),
        }
    }
}

impl std::fmt::Debug for WorkspaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceHandle").field("path", &self.path).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        removed: Mutex<Vec<PathBuf>>,
        fail_remove: bool,
    }

    impl WorkspaceStore for RecordingStore {
        fn create(&self, digest: &DigestHex) -> Result<PathBuf, WorkspaceError> {
            Ok(PathBuf::from(format!("/work/{digest}")))
        }

        fn remove(&self, path: &Path) -> Result<(), WorkspaceError> {
            self.removed.lock().unwrap().push(path.to_path_buf());
            if self.fail_remove {
                return Err(WorkspaceError::Remove {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("busy"),
                });
            }
            Ok(())
        }
    }

    fn hex() -> DigestHex {
        DigestHex::new("abc123").unwrap()
    }

    #[test]
    fn handle_removes_workspace_once_on_drop() {
        let store = Arc::new(RecordingStore::default());
        {
            let handle = WorkspaceHandle::acquire(store.clone(), &hex()).unwrap();
            assert_eq!(handle.path(), Path::new("/work/abc123"));
        }
        assert_eq!(*store.removed.lock().unwrap(), vec![PathBuf::from("/work/abc123")]);
    }

    #[test]
    fn explicit_release_does_not_remove_twice() {
        let store = Arc::new(RecordingStore::default());
        let handle = WorkspaceHandle::acquire(store.clone(), &hex()).unwrap();
        handle.release();
        assert_eq!(store.removed.lock().unwrap().len(), 1);
    }

    #[test]
    fn release_failure_is_swallowed() {
        let store = Arc::new(RecordingStore {
            fail_remove: true,
            ..RecordingStore::default()
        });
        WorkspaceHandle::acquire(store.clone(), &hex()).unwrap().release();
        assert_eq!(store.removed.lock().unwrap().len(), 1);
    }

    #[test]
    fn handle_is_released_on_early_error_return() {
        fn failing_step(store: Arc<dyn WorkspaceStore>) -> Result<(), CommandError> {
            let _workspace = WorkspaceHandle::acquire(store, &DigestHex::new("ff").unwrap())
                .map_err(|_| CommandError::EmptyCommand)?;
            Err(CommandError::Cancelled)
        }

        let store = Arc::new(RecordingStore::default());
        assert!(failing_step(store.clone()).is_err());
        assert_eq!(store.removed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn context_resolves_when_source_cancels() {
        let source = CancelSource::new();
        let ctx = source.context(Some(Duration::from_secs(1)));
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(1)));

        source.cancel();
        assert!(ctx.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("cancellation observed");
    }

    #[tokio::test]
    async fn background_context_never_cancels() {
        let ctx = ExecutionContext::background();
        assert!(!ctx.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }
}
