//! Changelog and release aggregation.
//!
//! Groups commits into releases bounded by version tags and resolves, per
//! commit, its tag, impact and owning workspace:
//!
//! - **tag**: the first explicit tag in the store, else [`detect_tag`]
//! - **impact**: the explicit impact in the store, else [`detect_impact`]
//! - **workspace**: the first workspace in store order containing the hash
//!
//! Releases render as a plain-text summary, Markdown, or lossless JSON.
//! Generation is read-only; only [`ReleaseGenerator::write_markdown`] touches disk.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, CommitRecord};
use crate::classify::{detect_impact, detect_tag, ChangeTag, Impact};
use crate::constants::UNRELEASED;
use crate::errors::GitsemError;
use crate::store::Meta;

const SUMMARY_RULE: &str = "───────────────────────";

/// Category order and labels used in change counts.
const CATEGORIES: [(&str, &str); 5] = [
    ("feature", "features"),
    ("fix", "fixes"),
    ("refactor", "refactors"),
    ("experiment", "experiments"),
    ("other", "other"),
];

/// A commit with its resolved classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub subject: String,
    pub tag: String,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub date: String,
}

impl ChangeEntry {
    /// The counting category: known tags as-is, everything else `other`.
    pub fn category(&self) -> &'static str {
        match self.tag.parse::<ChangeTag>() {
            Ok(ChangeTag::None) | Err(_) => "other",
            Ok(tag) => tag.as_str(),
        }
    }

    /// The tag as displayed next to the subject; empty and `none` show as `other`.
    pub fn label(&self) -> &str {
        match self.tag.as_str() {
            "" | "none" => "other",
            tag => tag,
        }
    }
}

/// A version label with its entries, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    /// Date of the oldest entry; empty when there are no entries.
    pub date: String,
    pub entries: Vec<ChangeEntry>,
}

impl Release {
    /// Highest impact across entries (`patch` when empty).
    pub fn max_impact(&self) -> Impact {
        self.entries.iter().map(|e| e.impact).max().unwrap_or_default()
    }

    /// Counts per category in fixed order, zero counts omitted.
    pub fn category_counts(&self) -> Vec<(&'static str, usize)> {
        CATEGORIES
            .iter()
            .filter_map(|(key, label)| {
                let n = self.entries.iter().filter(|e| e.category() == *key).count();
                (n > 0).then_some((*label, n))
            })
            .collect()
    }

    /// Distinct workspace names in first-appearance order.
    pub fn workspaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.entries.iter().filter_map(|e| e.workspace.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn changes_line(&self) -> String {
        self.category_counts()
            .iter()
            .map(|(label, n)| format!("{} {}", n, label))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `("Workspace", "a")`, `("Workspaces", "a, b")`, or `None`.
    fn workspace_line(&self) -> Option<(&'static str, String)> {
        let names = self.workspaces();
        match names.len() {
            0 => None,
            1 => Some(("Workspace", names[0].to_string())),
            _ => Some(("Workspaces", names.join(", "))),
        }
    }
}

/// Builds releases from history and metadata.
pub struct ReleaseGenerator<'a, B: Backend + ?Sized> {
    backend: &'a B,
    meta: &'a Meta,
}

impl<'a, B: Backend + ?Sized> ReleaseGenerator<'a, B> {
    pub fn new(backend: &'a B, meta: &'a Meta) -> Self {
        Self { backend, meta }
    }

    fn entry(&self, commit: &CommitRecord) -> ChangeEntry {
        let message = commit.message();
        let tag = self
            .meta
            .first_tag(&commit.hash)
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_else(|| detect_tag(message).to_string());
        let impact = self
            .meta
            .impacts
            .get(&commit.hash)
            .copied()
            .unwrap_or_else(|| detect_impact(message));
        let workspace = self
            .meta
            .workspace_for_commit(&commit.hash)
            .map(|w| w.name.clone());

        ChangeEntry {
            hash: commit.hash.clone(),
            short_hash: commit.short_hash.clone(),
            author: commit.author.clone(),
            subject: commit.subject.clone(),
            tag,
            impact,
            workspace,
            date: commit.date.clone(),
        }
    }

    /// Release for the commits in `(base, head]`.
    pub fn generate_release(
        &self,
        version: &str,
        base: &str,
        head: &str,
    ) -> Result<Release, GitsemError> {
        let commits = self.backend.commits_in_range(base, head)?;
        let entries: Vec<ChangeEntry> = commits.iter().map(|c| self.entry(c)).collect();
        let date = entries.first().map(|e| e.date.clone()).unwrap_or_default();

        tracing::debug!(version, base, head, entries = entries.len(), "Generated release");
        Ok(Release {
            version: version.to_string(),
            date,
            entries,
        })
    }

    /// Every release in history, newest first.
    ///
    /// The unreleased window is included only when non-empty; tagged windows
    /// are always included.
    pub fn generate_full(&self) -> Result<Vec<Release>, GitsemError> {
        let tags = self.backend.tags()?;
        let mut releases = Vec::new();

        let Some(newest) = tags.first() else {
            let all = self.generate_release(UNRELEASED, "", "HEAD")?;
            if !all.entries.is_empty() {
                releases.push(all);
            }
            return Ok(releases);
        };

        let unreleased = self.generate_release(UNRELEASED, newest, "HEAD")?;
        if !unreleased.entries.is_empty() {
            releases.push(unreleased);
        }

        for pair in tags.windows(2) {
            releases.push(self.generate_release(&pair[0], &pair[1], &pair[0])?);
        }

        if let Some(oldest) = tags.last() {
            releases.push(self.generate_release(oldest, "", oldest)?);
        }

        tracing::info!(releases = releases.len(), tags = tags.len(), "Generated release history");
        Ok(releases)
    }

    /// Write [`export_markdown`] output to `path`.
    pub fn write_markdown(&self, releases: &[Release], path: &Path) -> Result<(), GitsemError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, export_markdown(releases))?;
        tracing::info!(path = %path.display(), "Wrote release summary");
        Ok(())
    }
}

/// Plain-text summary of releases.
pub fn format_summary(releases: &[Release]) -> String {
    if releases.is_empty() {
        return "No releases found.".to_string();
    }

    let mut out = String::new();
    for release in releases {
        out.push_str(&format!("Release {}\n", release.version));
        out.push_str(&format!("Impact: {}\n", release.max_impact()));
        out.push_str(&format!("Changes: {}\n", release.changes_line()));
        if let Some((label, names)) = release.workspace_line() {
            out.push_str(&format!("{}: {}\n", label, names));
        }
        out.push_str(SUMMARY_RULE);
        out.push('\n');

        for entry in &release.entries {
            let tag = format!("{}:", entry.label());
            out.push_str(&format!("  {:<10} {} ({})\n", tag, entry.subject, entry.short_hash));
        }
        out.push('\n');
    }
    out
}

/// Markdown summary of releases.
pub fn export_markdown(releases: &[Release]) -> String {
    if releases.is_empty() {
        return "# Release Summary\n\nNo releases found.".to_string();
    }

    let mut out = String::from("# Release Summary\n\n");
    for release in releases {
        out.push_str(&format!("## {}\n", release.version));
        out.push_str(&format!("- **Impact:** {}\n", release.max_impact()));
        out.push_str(&format!("- **Changes:** {}\n", release.changes_line()));
        if let Some((label, names)) = release.workspace_line() {
            out.push_str(&format!("- **{}:** {}\n", label, names));
        }
        out.push_str("\n---\n\n");

        for entry in &release.entries {
            out.push_str(&format!(
                "- **{}:** {} (`{}`)\n",
                entry.label(),
                entry.subject,
                entry.short_hash
            ));
        }
        out.push('\n');
    }
    out
}

/// Pretty-printed JSON of the full release list.
pub fn export_json(releases: &[Release]) -> Result<String, GitsemError> {
    Ok(serde_json::to_string_pretty(releases)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryState};
    use crate::store::Workspace;

    fn entry(tag: &str, impact: Impact, workspace: Option<&str>) -> ChangeEntry {
        ChangeEntry {
            hash: format!("{}-hash", tag),
            short_hash: "abc1234".to_string(),
            author: "Ana".to_string(),
            subject: format!("{} subject", tag),
            tag: tag.to_string(),
            impact,
            workspace: workspace.map(str::to_string),
            date: "1 day ago".to_string(),
        }
    }

    fn workspace(name: &str, commits: &[&str]) -> Workspace {
        Workspace {
            id: name.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            commits: commits.iter().map(|c| c.to_string()).collect(),
            status: "active".to_string(),
        }
    }

    #[test]
    fn test_no_tags_single_unreleased() {
        let mut state = MemoryState::new();
        state.add_commit("feat: one");
        state.add_commit("fix: two");
        state.add_commit("chore: three");
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let releases = ReleaseGenerator::new(&backend, &meta).generate_full().unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].version, "Unreleased");
        assert_eq!(releases[0].entries.len(), 3);
        assert_eq!(releases[0].entries[0].subject, "feat: one");
        assert_eq!(releases[0].date, releases[0].entries[0].date);
    }

    #[test]
    fn test_empty_history_has_no_releases() {
        let backend = MemoryBackend::new();
        let meta = Meta::default();
        let releases = ReleaseGenerator::new(&backend, &meta).generate_full().unwrap();
        assert!(releases.is_empty());
    }

    #[test]
    fn test_tag_windows() {
        let mut state = MemoryState::new();
        let c1 = state.add_commit("feat: one");
        let c2 = state.add_commit("fix: two");
        let c3 = state.add_commit("feat: three");
        state.add_commit("fix: four");
        state.add_tag("v1.0.0", &c1);
        state.add_tag("v2.0.0", &c3);
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let releases = ReleaseGenerator::new(&backend, &meta).generate_full().unwrap();
        let versions: Vec<_> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["Unreleased", "v2.0.0", "v1.0.0"]);

        assert_eq!(releases[0].entries.len(), 1);
        let v2: Vec<_> = releases[1].entries.iter().map(|e| e.hash.as_str()).collect();
        assert_eq!(v2, vec![c2.as_str(), c3.as_str()]);
        assert_eq!(releases[2].entries.len(), 1);
        assert_eq!(releases[2].entries[0].hash, c1);
    }

    #[test]
    fn test_head_at_newest_tag_omits_unreleased() {
        let mut state = MemoryState::new();
        let c1 = state.add_commit("feat: one");
        let c2 = state.add_commit("feat: two");
        state.add_tag("v1", &c1);
        state.add_tag("v2", &c2);
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let releases = ReleaseGenerator::new(&backend, &meta).generate_full().unwrap();
        let versions: Vec<_> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["v2", "v1"]);
    }

    #[test]
    fn test_store_overrides_classifier() {
        let mut state = MemoryState::new();
        let a = state.add_commit("feat: add login");
        let b = state.add_commit("random message");
        let backend = MemoryBackend::with_state(state);

        let mut meta = Meta::default();
        meta.tags.insert(a.clone(), vec!["refactor".into(), "fix".into()]);
        meta.impacts.insert(b.clone(), Impact::Major);
        meta.workspaces = vec![workspace("First", &[&b]), workspace("Second", &[&a, &b])];

        let release = ReleaseGenerator::new(&backend, &meta)
            .generate_release("v1", "", "HEAD")
            .unwrap();

        assert_eq!(release.entries[0].tag, "refactor");
        assert_eq!(release.entries[0].impact, Impact::Minor);
        assert_eq!(release.entries[0].workspace.as_deref(), Some("Second"));

        assert_eq!(release.entries[1].tag, "none");
        assert_eq!(release.entries[1].impact, Impact::Major);
        assert_eq!(release.entries[1].workspace.as_deref(), Some("First"));
    }

    #[test]
    fn test_stored_tag_case_is_folded() {
        let mut state = MemoryState::new();
        let a = state.add_commit("random message");
        let b = state.add_commit("another message");
        let backend = MemoryBackend::with_state(state);

        let mut meta = Meta::default();
        meta.tags.insert(a.clone(), vec!["FEATURE".into()]);
        meta.tags.insert(b.clone(), vec!["None".into()]);

        let release = ReleaseGenerator::new(&backend, &meta)
            .generate_release("v1", "", "HEAD")
            .unwrap();
        assert_eq!(release.entries[0].tag, "feature");
        assert_eq!(release.entries[0].label(), "feature");
        assert_eq!(release.entries[1].label(), "other");
        assert_eq!(release.category_counts(), vec![("features", 1), ("other", 1)]);

        let text = format_summary(&[release]);
        assert!(text.contains("Changes: 1 features, 1 other\n"));
        assert!(text.contains("  feature:   random message"));
        assert!(!text.contains("FEATURE"));
    }

    #[test]
    fn test_classifier_sees_body_for_breaking_change() {
        let mut state = MemoryState::new();
        state.add_commit("fix: x\n\nBREAKING CHANGE: y");
        let backend = MemoryBackend::with_state(state);
        let meta = Meta::default();

        let release = ReleaseGenerator::new(&backend, &meta)
            .generate_release("v1", "", "HEAD")
            .unwrap();
        assert_eq!(release.entries[0].impact, Impact::Major);
        assert_eq!(release.max_impact(), Impact::Major);
    }

    #[test]
    fn test_bad_range_propagates() {
        let backend = MemoryBackend::new();
        let meta = Meta::default();
        let result = ReleaseGenerator::new(&backend, &meta).generate_release("v1", "nope", "HEAD");
        assert!(result.unwrap_err().is_backend());
    }

    #[test]
    fn test_empty_renders() {
        assert_eq!(format_summary(&[]), "No releases found.");
        assert_eq!(export_markdown(&[]), "# Release Summary\n\nNo releases found.");
        assert_eq!(export_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_counts_fold_unknown_tags_into_other() {
        let release = Release {
            version: "v1".into(),
            date: String::new(),
            entries: vec![
                entry("fix", Impact::Patch, None),
                entry("feature", Impact::Minor, None),
                entry("none", Impact::Patch, None),
                entry("docs", Impact::Patch, None),
                entry("feature", Impact::Minor, None),
            ],
        };
        assert_eq!(
            release.category_counts(),
            vec![("features", 2), ("fixes", 1), ("other", 2)]
        );
        assert_eq!(release.max_impact(), Impact::Minor);
    }

    #[test]
    fn test_summary_format() {
        let release = Release {
            version: "v1.2.0".into(),
            date: "2 days ago".into(),
            entries: vec![
                entry("feature", Impact::Minor, Some("Auth")),
                entry("none", Impact::Patch, Some("Auth")),
            ],
        };

        let text = format_summary(&[release]);
        assert!(text.starts_with("Release v1.2.0\nImpact: minor\nChanges: 1 features, 1 other\n"));
        assert!(text.contains("Workspace: Auth\n"));
        assert!(text.contains(SUMMARY_RULE));
        assert!(text.contains("  feature:   feature subject (abc1234)\n"));
        assert!(text.contains("  other:     none subject (abc1234)\n"));
    }

    #[test]
    fn test_markdown_multiple_workspaces() {
        let release = Release {
            version: "Unreleased".into(),
            date: String::new(),
            entries: vec![
                entry("fix", Impact::Patch, Some("Auth")),
                entry("fix", Impact::Major, Some("Billing")),
                entry("fix", Impact::Patch, Some("Auth")),
            ],
        };

        let md = export_markdown(&[release]);
        assert!(md.starts_with("# Release Summary\n\n## Unreleased\n- **Impact:** major\n"));
        assert!(md.contains("- **Changes:** 3 fixes\n"));
        assert!(md.contains("- **Workspaces:** Auth, Billing\n"));
        assert!(md.contains("- **fix:** fix subject (`abc1234`)\n"));
    }

    #[test]
    fn test_no_workspace_line_when_unattributed() {
        let release = Release {
            version: "v1".into(),
            date: String::new(),
            entries: vec![entry("fix", Impact::Patch, None)],
        };
        assert!(!format_summary(&[release.clone()]).contains("Workspace"));
        assert!(!export_markdown(&[release]).contains("Workspace"));
    }

    #[test]
    fn test_json_is_lossless() {
        let release = Release {
            version: "v1".into(),
            date: "now".into(),
            entries: vec![entry("feature", Impact::Minor, Some("Auth")), entry("fix", Impact::Patch, None)],
        };
        let json = export_json(&[release.clone()]).unwrap();
        let parsed: Vec<Release> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![release]);
        assert!(!json.contains("\"workspace\": null"));
    }

    #[test]
    fn test_write_markdown() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".gitsem/release.md");
        let backend = MemoryBackend::new();
        let meta = Meta::default();

        ReleaseGenerator::new(&backend, &meta).write_markdown(&[], &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Release Summary\n\nNo releases found."
        );
    }
}
