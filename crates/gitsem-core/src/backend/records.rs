//! Typed records produced from backend output.
//!
//! These are request-scoped: they are re-fetched on every call and never
//! cached across operations.

use serde::{Deserialize, Serialize};

/// A single commit as reported by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Full commit hash.
    pub hash: String,
    /// Abbreviated hash.
    pub short_hash: String,
    /// Parent hashes, in the order git reports them.
    pub parents: Vec<String>,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Relative committer date (e.g. "2 hours ago").
    pub date: String,
    /// Subject line.
    pub subject: String,
    /// Full raw message body.
    pub body: String,
}

impl CommitRecord {
    /// The text used for classification: the full body when present, else the subject.
    pub fn message(&self) -> &str {
        if self.body.trim().is_empty() {
            &self.subject
        } else {
            &self.body
        }
    }
}

/// A reference movement reported by `git reflog`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReflogRecord {
    /// Commit hash the reference moved to.
    pub hash: String,
    /// Ordinal selector, e.g. `HEAD@{3}`.
    pub selector: String,
    /// Action keyword (`commit`, `rebase`, `reset`, ...).
    pub action: String,
    /// Remainder of the reflog subject.
    pub message: String,
}

/// A registered worktree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeRecord {
    /// Filesystem path of the worktree.
    pub path: String,
    /// Checked-out branch with `refs/heads/` stripped (empty when detached).
    pub branch: String,
    /// HEAD commit hash.
    pub head: String,
    /// True for the first worktree git reports.
    pub is_main: bool,
}

/// Working-tree status of a single path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileStatusRecord {
    /// Path relative to the repository root.
    pub path: String,
    /// Whether the index column records a change.
    pub staged: bool,
    /// Modified in the index or the worktree.
    pub modified: bool,
    /// Added to the index or untracked.
    pub new: bool,
    /// Deleted in the index or the worktree.
    pub deleted: bool,
}

impl FileStatusRecord {
    /// Render the two-column porcelain code for this record.
    ///
    /// Used by the in-memory backend to keep its status text consistent with
    /// its file list.
    pub fn porcelain_code(&self) -> String {
        let index = if self.staged {
            if self.new {
                'A'
            } else if self.deleted {
                'D'
            } else {
                'M'
            }
        } else if self.new && !self.modified {
            '?'
        } else {
            ' '
        };

        let worktree = if self.staged {
            ' '
        } else if self.modified {
            'M'
        } else if self.deleted {
            'D'
        } else if self.new {
            '?'
        } else {
            ' '
        };

        format!("{}{}", index, worktree)
    }
}
