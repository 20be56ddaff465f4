//! Filesystem-backed workspace directories.

use std::path::{Path, PathBuf};

use uuid::Uuid;
use validation::{DigestHex, WorkspaceError, WorkspaceStore};

/// [`WorkspaceStore`] that creates directories under a root directory.
///
/// Directory names are `<digest-hex>-<request-unique suffix>`. The digest
/// prefix keeps workspaces traceable to their image; the suffix keeps two
/// concurrent requests for the same digest from sharing (and deleting) one
/// directory.
#[derive(Debug, Clone)]
pub struct FsWorkspaceStore {
    root: PathBuf,
}

impl FsWorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspaces under the system temporary directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkspaceStore for FsWorkspaceStore {
    fn create(&self, digest: &DigestHex) -> Result<PathBuf, WorkspaceError> {
        let path = self
            .root
            .join(format!("{digest}-{}", Uuid::new_v4().simple()));

        std::fs::create_dir_all(&self.root).map_err(|source| WorkspaceError::Create {
            path: self.root.clone(),
            source,
        })?;
        // `create_dir` rather than `create_dir_all`: an existing directory is an error.
        std::fs::create_dir(&path).map_err(|source| WorkspaceError::Create {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn remove(&self, path: &Path) -> Result<(), WorkspaceError> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkspaceError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
