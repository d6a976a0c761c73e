//! Repository hygiene checks.
//!
//! Cross-references the metadata store against live history. The analysis is
//! read-only: nothing is written back to the store.

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::constants::{HYGIENE_WINDOW, SQUASH_THRESHOLD, WIP_MARKERS};
use crate::errors::GitsemError;
use crate::store::Meta;

/// Result of a hygiene pass. Computed on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Recent subjects containing a WIP marker.
    pub wip_commits: Vec<String>,
    /// Names of workspaces with more commits than the squash threshold.
    pub squash_suggestions: Vec<String>,
    /// Names of workspaces referencing at least one unreachable commit.
    pub stale_workspaces: Vec<String>,
    /// Whether the working tree has uncommitted changes.
    pub dirty: bool,
}

impl HealthReport {
    pub fn is_clean(&self) -> bool {
        self.wip_commits.is_empty()
            && self.squash_suggestions.is_empty()
            && self.stale_workspaces.is_empty()
            && !self.dirty
    }
}

/// Whether a subject contains any WIP marker, case-insensitively.
pub fn is_wip(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    WIP_MARKERS.iter().any(|m| lower.contains(m))
}

pub struct HygieneAnalyzer<'a, B: Backend + ?Sized> {
    backend: &'a B,
    meta: &'a Meta,
}

impl<'a, B: Backend + ?Sized> HygieneAnalyzer<'a, B> {
    pub fn new(backend: &'a B, meta: &'a Meta) -> Self {
        Self { backend, meta }
    }

    /// Build the report.
    ///
    /// Failing status or history checks are logged and leave the matching
    /// section empty rather than failing the whole report.
    pub fn report(&self) -> Result<HealthReport, GitsemError> {
        let mut report = HealthReport::default();

        match self.backend.status() {
            Ok(status) => report.dirty = !status.trim().is_empty(),
            Err(e) => tracing::warn!(error = %e, "Status check failed"),
        }

        match self.backend.log(HYGIENE_WINDOW) {
            Ok(commits) => {
                report.wip_commits = commits
                    .into_iter()
                    .map(|c| c.subject)
                    .filter(|s| is_wip(s))
                    .collect();
            }
            Err(e) => tracing::warn!(error = %e, "History check failed"),
        }

        for workspace in &self.meta.workspaces {
            if workspace.commits.len() > SQUASH_THRESHOLD {
                report.squash_suggestions.push(workspace.name.clone());
            }

            // One unreachable member is enough; stop probing this workspace.
            if let Some(hash) = workspace
                .commits
                .iter()
                .find(|h| !self.backend.validate_hash(h))
            {
                tracing::debug!(workspace = %workspace.id, hash = %hash, "Stale workspace");
                report.stale_workspaces.push(workspace.name.clone());
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileStatusRecord, MemoryBackend, MemoryState};
    use crate::store::Workspace;

    fn workspace(id: &str, commits: &[&str]) -> Workspace {
        Workspace {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            commits: commits.iter().map(|c| c.to_string()).collect(),
            status: "active".to_string(),
        }
    }

    #[test]
    fn test_clean_repository() {
        let mut state = MemoryState::new();
        state.add_commit("feat: init");
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let report = HygieneAnalyzer::new(&backend, &meta).report().unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_wip_and_dirty() {
        let mut state = MemoryState::new();
        state.add_commit("feat: real work");
        state.add_commit("WIP: half done");
        state.add_commit("fix: remove Temporary hack");
        state.set_file(FileStatusRecord {
            path: "a.rs".into(),
            modified: true,
            ..Default::default()
        });
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let report = HygieneAnalyzer::new(&backend, &meta).report().unwrap();
        assert!(report.dirty);
        assert_eq!(
            report.wip_commits,
            vec!["fix: remove Temporary hack", "WIP: half done"]
        );
    }

    #[test]
    fn test_wip_window_is_bounded() {
        let mut state = MemoryState::new();
        state.add_commit("wip: too old to matter");
        for i in 0..HYGIENE_WINDOW {
            state.add_commit(&format!("feat: step {}", i));
        }
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let report = HygieneAnalyzer::new(&backend, &meta).report().unwrap();
        assert!(report.wip_commits.is_empty());
    }

    #[test]
    fn test_one_unreachable_hash_marks_workspace_stale() {
        let mut state = MemoryState::new();
        let a = state.add_commit("feat: a");
        let b = state.add_commit("feat: b");
        let backend = MemoryBackend::with_state(state);

        let meta = Meta {
            workspaces: vec![
                workspace("ok", &[&a, &b]),
                workspace("drifted", &[&a, "deadbeef", &b]),
            ],
            ..Meta::default()
        };

        let report = HygieneAnalyzer::new(&backend, &meta).report().unwrap();
        assert_eq!(report.stale_workspaces, vec!["DRIFTED"]);
        assert!(report.squash_suggestions.is_empty());
    }

    #[test]
    fn test_squash_suggested_regardless_of_staleness() {
        let backend = MemoryBackend::new();
        let meta = Meta {
            workspaces: vec![
                workspace("big", &["h1", "h2", "h3", "h4"]),
                workspace("small", &[]),
                workspace("three", &["x", "y", "z"]),
            ],
            ..Meta::default()
        };

        let report = HygieneAnalyzer::new(&backend, &meta).report().unwrap();
        assert_eq!(report.squash_suggestions, vec!["BIG"]);
        assert_eq!(report.stale_workspaces, vec!["BIG", "THREE"]);
    }

    #[test]
    fn test_is_wip() {
        assert!(is_wip("FIXME later"));
        assert!(is_wip("use template engine"));
        assert!(!is_wip("feat: add login"));
    }
}
