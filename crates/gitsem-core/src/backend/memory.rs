//! In-memory backend double.
//!
//! [`MemoryBackend`] keeps a small model of a repository (files, commits,
//! reflog, worktrees, tags) behind a `RefCell` and implements every
//! [`Backend`] operation against it. Higher-level components are tested
//! against it so their tests never spawn processes.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};

use crate::errors::GitsemError;
use crate::rebase::{render_todo, RebaseAction, RebaseStep};

use super::records::{CommitRecord, FileStatusRecord, ReflogRecord, WorktreeRecord};
use super::Backend;

/// Mutable repository model behind a [`MemoryBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub branch: String,
    pub files: Vec<FileStatusRecord>,
    /// Newest first, like `git log`.
    pub commits: Vec<CommitRecord>,
    /// Newest first, like `git reflog`.
    pub reflog: Vec<ReflogRecord>,
    pub worktrees: Vec<WorktreeRecord>,
    /// Descending version order.
    pub tags: Vec<String>,
    /// Tag name to the commit hash it points at.
    pub tag_refs: HashMap<String, String>,
    /// Hashes reachable from some branch in addition to those in `commits`.
    pub valid_hashes: HashSet<String>,
    /// Worktree diffs keyed by path.
    pub diffs: HashMap<String, String>,
    /// Index diffs keyed by path.
    pub staged_diffs: HashMap<String, String>,
    pub remote_url: String,
    pub applied_patches: Vec<String>,
    /// Last todo handed to the interactive rebase.
    pub rebase_todo: Option<String>,
    pub rebasing: bool,
    /// When set, the next interactive rebase stops as if it hit a conflict.
    pub rebase_conflict: bool,
    /// Every command passed to [`Backend::run`], space-joined.
    pub commands: Vec<String>,
    /// Canned output for [`Backend::run`], keyed by the space-joined command.
    pub outputs: HashMap<String, String>,
    next_id: u64,
}

impl MemoryState {
    /// A repository on `main` with no commits.
    pub fn new() -> Self {
        Self {
            branch: "main".to_string(),
            worktrees: vec![WorktreeRecord {
                path: "/repo".to_string(),
                branch: "main".to_string(),
                head: String::new(),
                is_main: true,
            }],
            ..Self::default()
        }
    }

    /// Append a new HEAD commit with a generated hash and return that hash.
    pub fn add_commit(&mut self, message: &str) -> String {
        self.next_id += 1;
        // The leading seven digits vary per commit so short hashes stay unique.
        let hash = format!(
            "{:07x}{:033x}",
            0xc0f_0000_u64 + self.next_id * 0x111,
            self.next_id
        );
        let record = CommitRecord {
            hash: hash.clone(),
            short_hash: hash[..7].to_string(),
            parents: self.commits.first().map(|c| vec![c.hash.clone()]).unwrap_or_default(),
            author: "Test Author".to_string(),
            email: "test@example.com".to_string(),
            date: format!("{} minutes ago", self.next_id),
            subject: message.lines().next().unwrap_or_default().to_string(),
            body: format!("{}\n", message),
        };
        self.commits.insert(0, record);
        self.push_reflog(&hash, "commit", message.lines().next().unwrap_or_default());
        if let Some(main) = self.worktrees.first_mut() {
            main.head = hash.clone();
        }
        hash
    }

    /// Tag `hash` and keep the tag list in descending version order.
    pub fn add_tag(&mut self, name: &str, hash: &str) {
        self.tag_refs.insert(name.to_string(), hash.to_string());
        self.tags.push(name.to_string());
        self.tags.sort_by(|a, b| version_key(b).cmp(&version_key(a)));
    }

    /// Add or replace a file in the status listing.
    pub fn set_file(&mut self, file: FileStatusRecord) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    fn push_reflog(&mut self, hash: &str, action: &str, message: &str) {
        for (i, entry) in self.reflog.iter_mut().enumerate() {
            entry.selector = format!("HEAD@{{{}}}", i + 1);
        }
        self.reflog.insert(
            0,
            ReflogRecord {
                hash: hash.to_string(),
                selector: "HEAD@{0}".to_string(),
                action: action.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Resolve `HEAD`, a tag, a reflog selector, or a (short) hash to a full hash.
    fn resolve(&self, reference: &str) -> Option<String> {
        if reference == "HEAD" {
            return self.commits.first().map(|c| c.hash.clone());
        }
        if let Some(hash) = self.tag_refs.get(reference) {
            return Some(hash.clone());
        }
        if let Some(entry) = self.reflog.iter().find(|e| e.selector == reference) {
            return Some(entry.hash.clone());
        }
        self.commits
            .iter()
            .find(|c| c.hash == reference || (!reference.is_empty() && c.hash.starts_with(reference)))
            .map(|c| c.hash.clone())
    }

    fn position(&self, reference: &str) -> Option<usize> {
        let hash = self.resolve(reference)?;
        self.commits.iter().position(|c| c.hash == hash)
    }
}

/// Numeric-aware sort key so that `v10.0.0` sorts above `v9.0.0`.
fn version_key(tag: &str) -> Vec<u64> {
    tag.trim_start_matches('v')
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|part| part.parse().ok())
        .collect()
}

fn not_found(args: &[&str], what: &str) -> GitsemError {
    GitsemError::backend(args, format!("fatal: {}", what).as_bytes(), b"")
}

/// [`Backend`] double over a [`MemoryState`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_state(MemoryState::new())
    }

    pub fn with_state(state: MemoryState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn state(&self) -> Ref<'_, MemoryState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, MemoryState> {
        self.state.borrow_mut()
    }
}

impl Backend for MemoryBackend {
    fn run(&self, args: &[&str]) -> Result<String, GitsemError> {
        let command = args.join(" ");
        let mut state = self.state.borrow_mut();
        state.commands.push(command.clone());
        Ok(state.outputs.get(&command).cloned().unwrap_or_default())
    }

    fn apply_patch_to_index(&self, patch: &str) -> Result<(), GitsemError> {
        if !patch.starts_with("diff --git ") {
            return Err(GitsemError::backend(
                &["apply", "--cached", "-"],
                b"error: No valid patches in input",
                b"",
            ));
        }
        self.state.borrow_mut().applied_patches.push(patch.to_string());
        Ok(())
    }

    fn run_interactive_rebase(&self, base: &str, steps: &[RebaseStep]) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        state.rebase_todo = Some(render_todo(steps));

        if state.rebase_conflict {
            state.rebasing = true;
            return Err(GitsemError::RebaseFailed {
                stderr: "CONFLICT (content): Merge conflict".to_string(),
            });
        }

        let split = if base.is_empty() {
            state.commits.len()
        } else {
            state
                .position(base)
                .ok_or_else(|| not_found(&["rebase", "-i", base], "invalid upstream"))?
        };

        // Hashes are kept stable; only order and membership change.
        let mut rewritten: Vec<CommitRecord> = Vec::new();
        for step in steps {
            let Some(commit) = state.commits[..split].iter().find(|c| c.hash == step.hash) else {
                continue;
            };
            match step.action {
                RebaseAction::Drop => {}
                RebaseAction::Squash | RebaseAction::Fixup if !rewritten.is_empty() => {}
                _ => rewritten.push(commit.clone()),
            }
        }
        rewritten.reverse();

        let below = state.commits.split_off(split);
        state.commits = rewritten;
        state.commits.extend(below);
        let head = state.commits.first().map(|c| c.hash.clone()).unwrap_or_default();
        state.push_reflog(&head, "rebase (finish)", "returning to refs/heads/main");
        Ok(())
    }

    fn current_branch(&self) -> Result<String, GitsemError> {
        Ok(self.state.borrow().branch.clone())
    }

    fn status(&self) -> Result<String, GitsemError> {
        let state = self.state.borrow();
        Ok(state
            .files
            .iter()
            .map(|f| format!("{} {}\n", f.porcelain_code(), f.path))
            .collect())
    }

    fn stage_file(&self, path: &str) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        let file = state
            .files
            .iter_mut()
            .find(|f| f.path == path)
            .ok_or_else(|| not_found(&["add", path], "pathspec did not match any files"))?;
        file.staged = true;
        Ok(())
    }

    fn unstage_file(&self, path: &str) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        let file = state
            .files
            .iter_mut()
            .find(|f| f.path == path)
            .ok_or_else(|| not_found(&["reset", "HEAD", "--", path], "pathspec did not match any files"))?;
        file.staged = false;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        if !state.files.iter().any(|f| f.staged) {
            return Err(GitsemError::backend(
                &["commit", "-m", message],
                b"",
                b"nothing to commit, working tree clean",
            ));
        }
        state.files.retain(|f| !f.staged);
        state.add_commit(message);
        Ok(())
    }

    fn last_commit_hash(&self) -> Result<String, GitsemError> {
        self.state
            .borrow()
            .commits
            .first()
            .map(|c| c.hash.clone())
            .ok_or_else(|| not_found(&["rev-parse", "HEAD"], "ambiguous argument 'HEAD'"))
    }

    fn remote_url(&self) -> Result<String, GitsemError> {
        Ok(self.state.borrow().remote_url.clone())
    }

    fn diff(&self, path: &str, staged: bool) -> Result<String, GitsemError> {
        let state = self.state.borrow();
        let diffs = if staged { &state.staged_diffs } else { &state.diffs };
        Ok(diffs.get(path).cloned().unwrap_or_default())
    }

    fn log(&self, n: usize) -> Result<Vec<CommitRecord>, GitsemError> {
        Ok(self.state.borrow().commits.iter().take(n).cloned().collect())
    }

    fn reflog(&self, n: usize) -> Result<Vec<ReflogRecord>, GitsemError> {
        Ok(self.state.borrow().reflog.iter().take(n).cloned().collect())
    }

    fn list_worktrees(&self) -> Result<Vec<WorktreeRecord>, GitsemError> {
        Ok(self.state.borrow().worktrees.clone())
    }

    fn add_worktree(&self, path: &str, branch: &str) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        if state.worktrees.iter().any(|w| w.path == path) {
            return Err(not_found(&["worktree", "add", path, branch], "path already exists"));
        }
        let head = state.commits.first().map(|c| c.hash.clone()).unwrap_or_default();
        state.worktrees.push(WorktreeRecord {
            path: path.to_string(),
            branch: branch.to_string(),
            head,
            is_main: false,
        });
        Ok(())
    }

    fn remove_worktree(&self, path: &str, _force: bool) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        let idx = state
            .worktrees
            .iter()
            .position(|w| w.path == path && !w.is_main)
            .ok_or_else(|| not_found(&["worktree", "remove", path], "not a working tree"))?;
        state.worktrees.remove(idx);
        Ok(())
    }

    fn reset_to(&self, target: &str) -> Result<(), GitsemError> {
        let mut state = self.state.borrow_mut();
        let idx = state
            .position(target)
            .ok_or_else(|| not_found(&["reset", "--hard", target], "unknown revision"))?;
        state.commits.drain(..idx);
        state.files.clear();
        let head = state.commits[0].hash.clone();
        state.push_reflog(&head, "reset", &format!("moving to {}", target));
        Ok(())
    }

    fn is_rebasing(&self) -> bool {
        self.state.borrow().rebasing
    }

    fn rebase_continue(&self) -> Result<(), GitsemError> {
        finish_rebase(&self.state, "--continue")
    }

    fn rebase_abort(&self) -> Result<(), GitsemError> {
        finish_rebase(&self.state, "--abort")
    }

    fn rebase_skip(&self) -> Result<(), GitsemError> {
        finish_rebase(&self.state, "--skip")
    }

    fn commits_in_range(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>, GitsemError> {
        let state = self.state.borrow();
        let head_idx = if state.commits.is_empty() && head == "HEAD" {
            0
        } else {
            state
                .position(head)
                .ok_or_else(|| not_found(&["log", head], "bad revision"))?
        };
        let base_idx = if base.is_empty() {
            state.commits.len()
        } else {
            state
                .position(base)
                .ok_or_else(|| not_found(&["log", base], "bad revision"))?
        };

        if base_idx <= head_idx {
            return Ok(Vec::new());
        }
        Ok(state.commits[head_idx..base_idx].iter().rev().cloned().collect())
    }

    fn tags(&self) -> Result<Vec<String>, GitsemError> {
        Ok(self.state.borrow().tags.clone())
    }

    fn validate_hash(&self, hash: &str) -> bool {
        let state = self.state.borrow();
        state.valid_hashes.contains(hash) || state.commits.iter().any(|c| c.hash == hash)
    }
}

fn finish_rebase(state: &RefCell<MemoryState>, flag: &str) -> Result<(), GitsemError> {
    let mut state = state.borrow_mut();
    if !state.rebasing {
        return Err(GitsemError::backend(&["rebase", flag], b"fatal: No rebase in progress?", b""));
    }
    state.rebasing = false;
    state.rebase_conflict = false;
    Ok(())
}
