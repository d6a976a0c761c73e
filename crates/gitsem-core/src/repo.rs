//! Repository root detection.
//!
//! [`Repository`] is a resolved working copy on disk: its root path and the
//! locations of the gitsem documents under `.gitsem/`.

use std::path::{Path, PathBuf};

use crate::constants::{
    GITSEM_DIR, META_FILENAME, PROJECT_CONFIG_FILENAME, RELEASE_EXPORT_FILENAME, SCHEMAS_DIR,
};
use crate::errors::GitsemError;

/// Check if a path is a disk root (e.g., `C:\` on Windows, `/` on Unix).
///
/// Metadata is never written at a filesystem root.
fn is_disk_root(path: &Path) -> bool {
    if path.parent().is_some() {
        return false;
    }

    #[cfg(windows)]
    {
        if let Some(s) = path.to_str() {
            if s.len() >= 2 && s.chars().nth(1) == Some(':') {
                return true;
            }
        }
    }

    #[cfg(not(windows))]
    {
        if path == Path::new("/") {
            return true;
        }
    }

    path.canonicalize().ok().is_some_and(|p| p.parent().is_none())
}

/// A resolved working copy.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    has_git: bool,
}

impl Repository {
    /// Create a `Repository` from a root directory path.
    ///
    /// # Errors
    ///
    /// Returns [`GitsemError::PathNotFound`] if the path does not exist or is
    /// not a directory, and [`GitsemError::InvalidPath`] for a disk root.
    pub fn from_root(root: &Path) -> Result<Self, GitsemError> {
        let root = root
            .canonicalize()
            .map_err(|_| GitsemError::PathNotFound(root.display().to_string()))?;

        if !root.is_dir() {
            return Err(GitsemError::PathNotFound(root.display().to_string()));
        }

        if is_disk_root(&root) {
            return Err(GitsemError::InvalidPath(format!(
                "Cannot use disk root {} as a repository root. \
                 Run gitsem inside a project directory instead.",
                root.display()
            )));
        }

        let has_git = root.join(".git").exists();
        Ok(Self { root, has_git })
    }

    /// Resolve a repository by walking up from `start_dir`.
    ///
    /// The first directory containing `.gitsem/meta.json` or `.git` wins. A
    /// bare `.gitsem/` is not a marker since the global config lives in
    /// `~/.gitsem/`. When no
    /// marker is found, `start_dir` itself is returned as a candidate so that
    /// `gitsem init` works anywhere.
    pub fn resolve(start_dir: &Path) -> Result<Self, GitsemError> {
        let start = start_dir
            .canonicalize()
            .map_err(|_| GitsemError::PathNotFound(start_dir.display().to_string()))?;

        let mut current = start.as_path();
        loop {
            if is_disk_root(current) {
                break;
            }

            // `.git` may be a file inside linked worktrees.
            if current.join(GITSEM_DIR).join(META_FILENAME).is_file()
                || current.join(".git").exists()
            {
                tracing::debug!(root = %current.display(), "Resolved repository root");
                return Self::from_root(current);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Self::from_root(&start)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_git(&self) -> bool {
        self.has_git
    }

    /// Whether `.gitsem/meta.json` exists.
    pub fn is_initialized(&self) -> bool {
        self.meta_path().is_file()
    }

    /// `.gitsem/`
    pub fn gitsem_dir(&self) -> PathBuf {
        self.root.join(GITSEM_DIR)
    }

    /// `.gitsem/meta.json`
    pub fn meta_path(&self) -> PathBuf {
        self.gitsem_dir().join(META_FILENAME)
    }

    /// `.gitsem/config.yml`
    pub fn config_path(&self) -> PathBuf {
        self.gitsem_dir().join(PROJECT_CONFIG_FILENAME)
    }

    /// `.gitsem/schemas/`
    pub fn schemas_dir(&self) -> PathBuf {
        self.gitsem_dir().join(SCHEMAS_DIR)
    }

    /// `.gitsem/release.md`
    pub fn release_export_path(&self) -> PathBuf {
        self.gitsem_dir().join(RELEASE_EXPORT_FILENAME)
    }
}
