//! Table rendering for CLI output using comfy-table.
//!
//! ## Tables Overview
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `gitsem log` | `render_log_table()` |
//! | `gitsem reflog` | `render_reflog_table()` |
//! | `gitsem worktree list` | `render_worktree_table()` |
//! | `gitsem workspace list` | `render_workspace_table()` |
//! | `gitsem rebase plan` | `render_plan_table()` |
//! | `gitsem diff` | `render_hunk_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};
use serde::Serialize;

use gitsem_core::{FileDiff, Impact, RebasePlan, ReflogRecord, Workspace, WorktreeRecord};

use super::format::{line_stats, truncate_str};

/// A commit annotated with its stored metadata, as shown by `gitsem log`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRow {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
    pub tag: Option<String>,
    pub impact: Option<Impact>,
    pub workspace: Option<String>,
}

fn new_table(headers: Vec<Cell>, widths: &[u16]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(headers);
    table.set_constraints(
        widths
            .iter()
            .map(|w| ColumnConstraint::LowerBoundary(Width::Fixed(*w))),
    );
    table
}

/// Render the annotated history for `gitsem log`.
///
/// `subject_width` bounds the SUBJECT column so rows stay on one line.
///
/// # Example Output
///
/// ```text
/// HASH      TAG       IMPACT  WORKSPACE  DATE          SUBJECT
/// abc1234   feature   minor   Auth       2 hours ago   feat(auth): add login
/// def5678   -         -       -          3 days ago    update readme
/// ```
pub fn render_log_table(rows: &[LogRow], subject_width: usize) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new("HASH"),
            Cell::new("TAG"),
            Cell::new("IMPACT"),
            Cell::new("WORKSPACE"),
            Cell::new("DATE"),
            Cell::new("SUBJECT"),
        ],
        &[8, 9, 6, 10, 12, 20],
    );

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.short_hash),
            Cell::new(row.tag.as_deref().unwrap_or("-")),
            Cell::new(row.impact.map(|i| i.as_str()).unwrap_or("-")),
            Cell::new(truncate_str(row.workspace.as_deref().unwrap_or("-"), 16)),
            Cell::new(&row.date),
            Cell::new(truncate_str(&row.subject, subject_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render reference movements for `gitsem reflog`.
pub fn render_reflog_table(entries: &[ReflogRecord]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new("SELECTOR"),
            Cell::new("HASH"),
            Cell::new("ACTION"),
            Cell::new("MESSAGE"),
        ],
        &[10, 8, 8, 30],
    );

    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.selector),
            Cell::new(entry.hash.get(..8).unwrap_or(&entry.hash)),
            Cell::new(&entry.action),
            Cell::new(truncate_str(&entry.message, 60)),
        ]);
    }

    table.trim_fmt().to_string()
}

pub fn render_worktree_table(worktrees: &[WorktreeRecord]) -> String {
    if worktrees.is_empty() {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new(""),
            Cell::new("PATH"),
            Cell::new("BRANCH"),
            Cell::new("HEAD"),
        ],
        &[1, 20, 10, 8],
    );

    for wt in worktrees {
        let branch = if wt.branch.is_empty() {
            "(detached)"
        } else {
            &wt.branch
        };
        table.add_row(vec![
            Cell::new(if wt.is_main { "*" } else { "" }),
            Cell::new(&wt.path),
            Cell::new(branch),
            Cell::new(wt.head.get(..8).unwrap_or(&wt.head)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render workspaces for `gitsem workspace list`, marking the active one.
///
/// # Example Output
///
/// ```text
///    ID        NAME      COMMITS  STATUS
/// *  general   General         3  active
///    auth      Auth            1  active
/// ```
pub fn render_workspace_table(workspaces: &[Workspace], active: &str) -> String {
    if workspaces.is_empty() {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new(""),
            Cell::new("ID"),
            Cell::new("NAME"),
            Cell::new("COMMITS").set_alignment(CellAlignment::Right),
            Cell::new("STATUS"),
        ],
        &[1, 8, 8, 7, 6],
    );

    for ws in workspaces {
        table.add_row(vec![
            Cell::new(if ws.id == active { "*" } else { "" }),
            Cell::new(&ws.id),
            Cell::new(truncate_str(&ws.name, 24)),
            Cell::new(ws.commits.len()).set_alignment(CellAlignment::Right),
            Cell::new(&ws.status),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the steps of a rebase plan, numbered from 1.
pub fn render_plan_table(plan: &RebasePlan) -> String {
    if plan.is_empty() {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new("#").set_alignment(CellAlignment::Right),
            Cell::new("ACTION"),
            Cell::new("HASH"),
            Cell::new("MESSAGE"),
        ],
        &[2, 6, 8, 30],
    );

    for (i, step) in plan.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(step.action),
            Cell::new(step.hash.get(..8).unwrap_or(&step.hash)),
            Cell::new(truncate_str(&step.message, 60)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the hunks of every file in a diff, numbered from 1 per file.
pub fn render_hunk_table(files: &[FileDiff]) -> String {
    if files.iter().all(|f| f.hunks.is_empty()) {
        return String::new();
    }

    let mut table = new_table(
        vec![
            Cell::new("FILE"),
            Cell::new("#").set_alignment(CellAlignment::Right),
            Cell::new("CHANGES"),
            Cell::new("HEADER"),
        ],
        &[10, 2, 8, 16],
    );

    for file in files {
        for (i, hunk) in file.hunks.iter().enumerate() {
            table.add_row(vec![
                Cell::new(&file.path),
                Cell::new(i + 1).set_alignment(CellAlignment::Right),
                Cell::new(line_stats(hunk.line_stats())),
                Cell::new(truncate_str(&hunk.header, 60)),
            ]);
        }
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsem_core::{parse_diff, RebaseAction, RebaseStep};

    fn log_rows() -> Vec<LogRow> {
        vec![
            LogRow {
                hash: "abc1234def567890".into(),
                short_hash: "abc1234".into(),
                author: "Ada".into(),
                date: "2 hours ago".into(),
                subject: "feat(auth): add login".into(),
                tag: Some("feature".into()),
                impact: Some(Impact::Minor),
                workspace: Some("Auth".into()),
            },
            LogRow {
                hash: "def5678abc123456".into(),
                short_hash: "def5678".into(),
                author: "Ada".into(),
                date: "3 days ago".into(),
                subject: "update readme".into(),
                tag: None,
                impact: None,
                workspace: None,
            },
        ]
    }

    #[test]
    fn test_log_table() {
        let output = render_log_table(&log_rows(), 40);
        assert!(output.contains("HASH"));
        assert!(output.contains("IMPACT"));
        assert!(output.contains("abc1234"));
        assert!(output.contains("feature"));
        assert!(output.contains("minor"));
        assert!(output.contains("feat(auth): add login"));
    }

    #[test]
    fn test_log_table_truncates_subject() {
        let output = render_log_table(&log_rows(), 8);
        assert!(output.contains("feat(..."));
        assert!(!output.contains("add login"));
    }

    #[test]
    fn test_workspace_table_marks_active() {
        let mut auth = Workspace::new("auth", "Auth", "");
        auth.commits.push("h1".into());
        let workspaces = vec![Workspace::new("general", "General", ""), auth];

        let output = render_workspace_table(&workspaces, "auth");
        let auth_line = output.lines().find(|l| l.contains("auth")).unwrap();
        assert!(auth_line.trim_start().starts_with('*'));
        let general_line = output.lines().find(|l| l.contains("general")).unwrap();
        assert!(!general_line.contains('*'));
    }

    #[test]
    fn test_plan_table_is_numbered_from_one() {
        let mut plan = RebasePlan {
            base: "base".into(),
            steps: vec![RebaseStep::pick("aaaaaaaaaa", "first"), RebaseStep::pick("bbbbbbbbbb", "second")],
        };
        plan.set_action(1, RebaseAction::Squash).unwrap();

        let output = render_plan_table(&plan);
        assert!(output.contains("aaaaaaaa"));
        assert!(output.contains("squash"));
        let second = output.lines().find(|l| l.contains("bbbbbbbb")).unwrap();
        assert!(second.trim_start().starts_with('2'));
    }

    #[test]
    fn test_hunk_table() {
        let files = parse_diff("diff --git a/x.rs b/x.rs\n@@ -1 +1,2 @@\n-a\n+b\n+c\n");
        let output = render_hunk_table(&files);
        assert!(output.contains("x.rs"));
        assert!(output.contains("+2 -1"));
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(render_log_table(&[], 40), "");
        assert_eq!(render_reflog_table(&[]), "");
        assert_eq!(render_worktree_table(&[]), "");
        assert_eq!(render_workspace_table(&[], ""), "");
        assert_eq!(render_hunk_table(&[]), "");
    }
}
