//! Unified diff model for hunk-level staging.
//!
//! [`parse_diff`] splits raw `git diff` output into [`FileDiff`]s, each owning
//! its [`Hunk`]s. A hunk can be turned back into a standalone patch with
//! [`Hunk::to_patch`] and applied to the index.
//!
//! Hunk content is kept byte-for-byte: header line plus body lines, each
//! newline-terminated. Line counts in the `@@` header are never recomputed,
//! so a patch only applies while the file is unchanged since the diff was taken.

use serde::{Deserialize, Serialize};

const FILE_MARKER: &str = "diff --git";
const HUNK_MARKER: &str = "@@";

/// One contiguous block of changes within a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hunk {
    /// The `@@ -a,b +c,d @@` line.
    pub header: String,
    /// Header plus body lines, newline-terminated.
    pub content: String,
}

impl Hunk {
    fn open(line: &str) -> Self {
        let mut content = line.to_string();
        terminate(&mut content);
        Self {
            header: line.trim_end_matches(['\n', '\r']).to_string(),
            content,
        }
    }

    /// Serialize this hunk as a patch against `path`, suitable for `git apply --cached`.
    pub fn to_patch(&self, path: &str) -> String {
        let mut patch = String::with_capacity(self.content.len() + 3 * (path.len() + 16));
        patch.push_str(&format!("diff --git a/{} b/{}\n", path, path));
        patch.push_str(&format!("--- a/{}\n", path));
        patch.push_str(&format!("+++ b/{}\n", path));
        patch.push_str(&self.content);
        patch
    }

    /// Number of added and removed lines in this hunk.
    pub fn line_stats(&self) -> (usize, usize) {
        self.content
            .lines()
            .skip(1)
            .fold((0, 0), |(add, del), line| match line.as_bytes().first() {
                Some(b'+') => (add + 1, del),
                Some(b'-') => (add, del + 1),
                _ => (add, del),
            })
    }
}

/// All hunks of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub hunks: Vec<Hunk>,
}

/// Parse raw unified diff output.
///
/// File preamble lines (`index`, `---`, `+++`) are not kept; they are
/// regenerated by [`Hunk::to_patch`]. Hunks appearing before any file
/// marker are discarded.
pub fn parse_diff(raw: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut file: Option<FileDiff> = None;
    let mut hunk: Option<Hunk> = None;

    for line in raw.split_inclusive('\n') {
        if line.starts_with(FILE_MARKER) {
            flush(&mut files, &mut file, &mut hunk);
            file = Some(FileDiff {
                path: path_from_marker(line),
                hunks: Vec::new(),
            });
            continue;
        }

        if line.starts_with(HUNK_MARKER) {
            if let (Some(f), Some(h)) = (file.as_mut(), hunk.take()) {
                f.hunks.push(h);
            }
            hunk = Some(Hunk::open(line));
            continue;
        }

        if let Some(h) = hunk.as_mut() {
            h.content.push_str(line);
            terminate(&mut h.content);
        }
    }

    flush(&mut files, &mut file, &mut hunk);
    files
}

fn flush(files: &mut Vec<FileDiff>, file: &mut Option<FileDiff>, hunk: &mut Option<Hunk>) {
    let pending = hunk.take();
    if let Some(mut f) = file.take() {
        f.hunks.extend(pending);
        files.push(f);
    }
}

/// `diff --git a/<path> b/<path>`: third token, `a/` stripped.
fn path_from_marker(line: &str) -> String {
    let line = line.trim_end_matches(['\n', '\r']);
    line.split(' ')
        .nth(2)
        .map(|token| token.strip_prefix("a/").unwrap_or(token).to_string())
        .unwrap_or_default()
}

fn terminate(content: &mut String) {
    if !content.ends_with('\n') {
        content.push('\n');
    }
}
