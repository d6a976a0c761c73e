//! Error types for gitsem-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for gitsem operations.
#[derive(Error, Debug)]
pub enum GitsemError {
    /// A backend command exited with a non-zero status.
    #[error("git {command} failed\nstderr: {stderr}\nstdout: {stdout}")]
    Backend {
        /// The arguments passed to git, joined with spaces.
        command: String,
        /// Captured standard error (trimmed).
        stderr: String,
        /// Captured standard output (trimmed).
        stdout: String,
    },

    /// The backend process could not be started.
    #[error("Failed to spawn `git {command}`: {message}")]
    Spawn {
        /// The arguments passed to git, joined with spaces.
        command: String,
        /// Description of the spawn failure.
        message: String,
    },

    /// The backend command exceeded its deadline and was killed.
    #[error("git {command} timed out")]
    Timeout {
        /// The arguments passed to git, joined with spaces.
        command: String,
    },

    /// The backend command was cancelled by the caller and was killed.
    #[error("git {command} was cancelled")]
    Cancelled {
        /// The arguments passed to git, joined with spaces.
        command: String,
    },

    /// An interactive rebase stopped with a non-zero exit (usually a conflict).
    #[error("Rebase failed: {stderr}")]
    RebaseFailed {
        /// Captured standard error of the rebase.
        stderr: String,
    },

    /// The referenced workspace does not exist in the metadata store.
    #[error("Workspace `{0}` not found.")]
    WorkspaceNotFound(String),

    /// A workspace with this id is already present.
    #[error("Workspace `{0}` already exists.")]
    WorkspaceExists(String),

    /// The metadata store has already been bootstrapped.
    #[error("gitsem already initialized at {}", path.display())]
    AlreadyInitialized {
        /// Path of the existing metadata document.
        path: PathBuf,
    },

    /// A commit was requested with nothing in the index.
    #[error("Nothing to commit. Stage your changes first.")]
    NothingToCommit,

    /// A rebase step index is out of range, or the move is not possible.
    #[error("Invalid rebase step index {index} (plan has {len} steps)")]
    InvalidStepIndex {
        /// The requested index.
        index: usize,
        /// Number of steps in the plan.
        len: usize,
    },

    /// Invalid argument provided to an operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// Failed to read the metadata document.
    #[error("Failed to read metadata at `{path}`: {message}")]
    MetaRead {
        /// Path to the metadata document.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Failed to parse the metadata document.
    #[error("Failed to parse metadata at `{path}`: {message}")]
    MetaParse {
        /// Path to the metadata document.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Failed to write the metadata document.
    #[error("Failed to write metadata at `{path}`: {message}")]
    MetaWrite {
        /// Path to the metadata document.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A configuration file exists but is invalid.
    #[error("Config invalid: {0}")]
    ConfigInvalid(String),

    /// A path or file was not found.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// An invalid path was provided (e.g., disk root).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GitsemError {
    /// Build a [`GitsemError::Backend`] from raw process output.
    pub fn backend(args: &[&str], stderr: &[u8], stdout: &[u8]) -> Self {
        Self::Backend {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
            stdout: String::from_utf8_lossy(stdout).trim().to_string(),
        }
    }

    /// Whether this error came from the backend process rather than from gitsem itself.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. } | Self::Spawn { .. } | Self::Timeout { .. } | Self::Cancelled { .. }
        )
    }
}
