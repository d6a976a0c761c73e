//! Parsers for raw backend output.
//!
//! Every parser is total: well-formed but empty input yields an empty list,
//! and records missing required fields are skipped rather than reported.

use crate::constants::{LOG_FIELD_SEP, LOG_RECORD_SEP, MIN_LOG_FIELDS};

use super::records::{CommitRecord, FileStatusRecord, ReflogRecord, WorktreeRecord};

/// Parse `git log` output produced with [`crate::constants::LOG_FORMAT`].
///
/// Records are split on the record separator and fields on the unit separator,
/// so newlines inside commit bodies are preserved. Records with fewer than
/// seven fields are dropped without shifting the ones that follow.
pub fn parse_log(output: &str) -> Vec<CommitRecord> {
    output
        .split(LOG_RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let parts: Vec<&str> = record.split(LOG_FIELD_SEP).collect();
            if parts.len() < MIN_LOG_FIELDS {
                tracing::debug!(fields = parts.len(), "Skipping malformed log record");
                return None;
            }

            let parents = if parts[2].is_empty() {
                Vec::new()
            } else {
                parts[2].split(' ').map(str::to_string).collect()
            };

            Some(CommitRecord {
                hash: parts[0].to_string(),
                short_hash: parts[1].to_string(),
                parents,
                author: parts[3].to_string(),
                email: parts[4].to_string(),
                date: parts[5].to_string(),
                subject: parts[6].to_string(),
                body: parts.get(7).map(|b| b.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// Parse `git reflog` output produced with [`crate::constants::REFLOG_FORMAT`].
///
/// The subject is split on the first `": "` into action and message. Subjects
/// without that separator get the action `commit` when they start with it and
/// `unknown` otherwise.
pub fn parse_reflog(output: &str) -> Vec<ReflogRecord> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            let hash = parts.next()?;
            let selector = parts.next()?;
            let subject = parts.next()?;
            let (action, message) = split_reflog_subject(subject);

            Some(ReflogRecord {
                hash: hash.to_string(),
                selector: selector.to_string(),
                action,
                message,
            })
        })
        .collect()
}

fn split_reflog_subject(subject: &str) -> (String, String) {
    if let Some((action, message)) = subject.split_once(": ") {
        return (action.to_string(), message.to_string());
    }

    let action = if subject.starts_with("commit") {
        "commit"
    } else {
        "unknown"
    };
    (action.to_string(), subject.to_string())
}

/// Parse `git worktree list --porcelain` output.
///
/// Records are separated by blank lines; a trailing record without a final
/// blank line is still emitted. The first record is flagged as the main worktree.
pub fn parse_worktrees(output: &str) -> Vec<WorktreeRecord> {
    let mut worktrees = Vec::new();
    let mut current = WorktreeRecord::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            if !current.path.is_empty() {
                worktrees.push(std::mem::take(&mut current));
            }
            continue;
        }

        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };

        match key {
            "worktree" => current.path = value.to_string(),
            "branch" => {
                current.branch = value.strip_prefix("refs/heads/").unwrap_or(value).to_string()
            }
            "HEAD" => current.head = value.to_string(),
            _ => {}
        }
    }

    if !current.path.is_empty() {
        worktrees.push(current);
    }

    if let Some(main) = worktrees.first_mut() {
        main.is_main = true;
    }

    worktrees
}

/// Parse `git status --porcelain` output.
///
/// Column 1 is the index state, column 2 the worktree state, and the rest of
/// the line (trimmed) is the path. Lines shorter than four characters are skipped.
pub fn parse_status(output: &str) -> Vec<FileStatusRecord> {
    output
        .lines()
        .filter_map(|line| {
            let bytes = line.as_bytes();
            if bytes.len() < 4 {
                return None;
            }
            let index = bytes[0];
            let worktree = bytes[1];
            let path = line.get(2..)?.trim();

            Some(FileStatusRecord {
                path: path.to_string(),
                staged: index != b' ' && index != b'?',
                modified: index == b'M' || worktree == b'M',
                new: index == b'A' || index == b'?' || worktree == b'?',
                deleted: index == b'D' || worktree == b'D',
            })
        })
        .collect()
}

/// Split a newline-separated listing (tags, subjects) into its non-empty lines.
pub fn parse_lines(output: &str) -> Vec<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.lines().map(str::to_string).collect()
}
