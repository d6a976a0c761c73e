//! Access to the version-control backend.
//!
//! The [`Backend`] trait is the single capability surface the rest of the
//! crate depends on. Two implementations exist:
//!
//! - [`GitBackend`] – spawns the `git` binary in a repository root
//! - [`MemoryBackend`] – an in-memory double for tests and demos
//!
//! Most operations have default implementations expressed through
//! [`Backend::run`] and the pure parsers in [`parse`], so a new
//! implementation only has to provide command execution plus the operations
//! that need stdin or a custom environment.

pub mod memory;
pub mod parse;
pub mod process;
pub mod records;

pub use memory::{MemoryBackend, MemoryState};
pub use process::{CancelToken, CommandScope, GitBackend};
pub use records::{CommitRecord, FileStatusRecord, ReflogRecord, WorktreeRecord};

use crate::constants::{LOG_FORMAT, REFLOG_FORMAT};
use crate::errors::GitsemError;
use crate::rebase::RebaseStep;

/// Capability interface over the version-control backend.
///
/// All operations are synchronous. Failures carry the invoked command and
/// the captured diagnostic output (see [`GitsemError::Backend`]).
pub trait Backend {
    /// Run an arbitrary backend command and return its standard output.
    fn run(&self, args: &[&str]) -> Result<String, GitsemError>;

    /// Stage a patch into the index (`git apply --cached`).
    fn apply_patch_to_index(&self, patch: &str) -> Result<(), GitsemError>;

    /// Replace the rebase todo with `steps` and run an interactive rebase onto `base`.
    fn run_interactive_rebase(&self, base: &str, steps: &[RebaseStep]) -> Result<(), GitsemError>;

    /// Name of the checked-out branch.
    fn current_branch(&self) -> Result<String, GitsemError> {
        Ok(self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
    }

    /// Raw porcelain status text.
    fn status(&self) -> Result<String, GitsemError> {
        self.run(&["status", "--porcelain"])
    }

    /// Parsed porcelain status.
    fn parse_status(&self) -> Result<Vec<FileStatusRecord>, GitsemError> {
        Ok(parse::parse_status(&self.status()?))
    }

    /// Add a path to the index.
    fn stage_file(&self, path: &str) -> Result<(), GitsemError> {
        self.run(&["add", path]).map(|_| ())
    }

    /// Remove a path from the index (works for newly added files too).
    fn unstage_file(&self, path: &str) -> Result<(), GitsemError> {
        self.run(&["reset", "HEAD", "--", path]).map(|_| ())
    }

    /// Create a commit from the index.
    fn commit(&self, message: &str) -> Result<(), GitsemError> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    /// Hash of the HEAD commit.
    fn last_commit_hash(&self) -> Result<String, GitsemError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// URL of the `origin` remote; empty when no remote is configured.
    fn remote_url(&self) -> Result<String, GitsemError> {
        match self.run(&["remote", "get-url", "origin"]) {
            Ok(url) => Ok(url.trim().to_string()),
            Err(err) if matches!(err, GitsemError::Backend { .. }) => {
                tracing::debug!("No origin remote configured");
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Unified diff for a path, against the index (`staged`) or the worktree.
    fn diff(&self, path: &str, staged: bool) -> Result<String, GitsemError> {
        if staged {
            self.run(&["diff", "--cached", "--", path])
        } else {
            self.run(&["diff", "--", path])
        }
    }

    /// The most recent `n` commits, newest first.
    fn log(&self, n: usize) -> Result<Vec<CommitRecord>, GitsemError> {
        let limit = format!("-n{}", n);
        let pretty = format!("--pretty=format:{}", LOG_FORMAT);
        Ok(parse::parse_log(&self.run(&["log", &limit, &pretty])?))
    }

    /// The most recent `n` reflog entries, newest first.
    fn reflog(&self, n: usize) -> Result<Vec<ReflogRecord>, GitsemError> {
        let limit = format!("-n{}", n);
        let pretty = format!("--pretty=format:{}", REFLOG_FORMAT);
        Ok(parse::parse_reflog(&self.run(&["reflog", &limit, &pretty])?))
    }

    /// Registered worktrees; the first one is the main worktree.
    fn list_worktrees(&self) -> Result<Vec<WorktreeRecord>, GitsemError> {
        Ok(parse::parse_worktrees(&self.run(&["worktree", "list", "--porcelain"])?))
    }

    /// Check out `branch` into a new worktree at `path`.
    fn add_worktree(&self, path: &str, branch: &str) -> Result<(), GitsemError> {
        self.run(&["worktree", "add", path, branch]).map(|_| ())
    }

    /// Remove the worktree at `path`.
    fn remove_worktree(&self, path: &str, force: bool) -> Result<(), GitsemError> {
        if force {
            self.run(&["worktree", "remove", path, "--force"]).map(|_| ())
        } else {
            self.run(&["worktree", "remove", path]).map(|_| ())
        }
    }

    /// Hard reset to a commit or reflog selector.
    fn reset_to(&self, target: &str) -> Result<(), GitsemError> {
        self.run(&["reset", "--hard", target]).map(|_| ())
    }

    /// Whether a rebase is currently stopped in the working copy.
    fn is_rebasing(&self) -> bool {
        self.run(&["rebase", "--show-current-patch"]).is_ok()
    }

    /// Continue a stopped rebase.
    fn rebase_continue(&self) -> Result<(), GitsemError> {
        self.run(&["rebase", "--continue"]).map(|_| ())
    }

    /// Abort a stopped rebase.
    fn rebase_abort(&self) -> Result<(), GitsemError> {
        self.run(&["rebase", "--abort"]).map(|_| ())
    }

    /// Skip the current patch of a stopped rebase.
    fn rebase_skip(&self) -> Result<(), GitsemError> {
        self.run(&["rebase", "--skip"]).map(|_| ())
    }

    /// Commits in `(base, head]`, oldest first. An empty `base` means all of
    /// history up to `head`.
    fn commits_in_range(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>, GitsemError> {
        let range = if base.is_empty() {
            head.to_string()
        } else {
            format!("{}..{}", base, head)
        };
        let pretty = format!("--pretty=format:{}", LOG_FORMAT);
        Ok(parse::parse_log(&self.run(&["log", &pretty, "--reverse", &range])?))
    }

    /// Tags in descending version order.
    fn tags(&self) -> Result<Vec<String>, GitsemError> {
        Ok(parse::parse_lines(&self.run(&["tag", "-l", "--sort=-v:refname"])?))
    }

    /// Whether `hash` exists and is reachable from any branch.
    fn validate_hash(&self, hash: &str) -> bool {
        match self.run(&["branch", "-a", "--contains", hash]) {
            Ok(output) => !output.trim().is_empty(),
            Err(err) => {
                tracing::debug!(hash, error = %err, "Hash is not reachable");
                false
            }
        }
    }
}
