//! Common constants used throughout gitsem-core.
//!
//! This module centralizes paths, wire-format markers, and tuning defaults
//! to avoid duplication and ensure consistency across the codebase.

use std::time::Duration;

// ============================================================================
// Directory and File Names
// ============================================================================

/// The name of the gitsem metadata directory within a repository.
///
/// All gitsem-managed data lives under `.gitsem/` at the repository root.
pub const GITSEM_DIR: &str = ".gitsem";

/// The metadata document (workspaces, tags, impacts).
pub const META_FILENAME: &str = "meta.json";

/// The project-level configuration document.
pub const PROJECT_CONFIG_FILENAME: &str = "config.yml";

/// Directory under `.gitsem/` holding the JSON Schemas for the documents above.
pub const SCHEMAS_DIR: &str = "schemas";

/// Markdown release summary written by the export command.
pub const RELEASE_EXPORT_FILENAME: &str = "release.md";

/// The name of the global gitsem configuration directory (`~/.gitsem/`).
pub const GITSEM_HOME_DIR: &str = ".gitsem";

/// The global configuration file inside [`GITSEM_HOME_DIR`].
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

// ============================================================================
// Backend Wire Format
// ============================================================================

/// Field separator inside a log record (ASCII unit separator).
pub const LOG_FIELD_SEP: char = '\x1f';

/// Record separator between log records (ASCII record separator).
pub const LOG_RECORD_SEP: char = '\x1e';

/// `--pretty` format producing one separator-delimited record per commit.
///
/// Fields: hash, short hash, parents, author, email, relative date, subject, body.
pub const LOG_FORMAT: &str = "%H%x1f%h%x1f%P%x1f%an%x1f%ae%x1f%cr%x1f%s%x1f%B%x1f%x1e";

/// Minimum number of fields for a log record to be kept.
pub const MIN_LOG_FIELDS: usize = 7;

/// `--pretty` format for reflog lines: hash, selector, subject.
pub const REFLOG_FORMAT: &str = "%H|%gD|%gs";

// ============================================================================
// Defaults
// ============================================================================

/// Default number of commits fetched for the history view.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default number of reflog entries fetched.
pub const DEFAULT_REFLOG_LIMIT: usize = 50;

/// Number of recent commits scanned for WIP markers.
pub const HYGIENE_WINDOW: usize = 10;

/// Workspaces with more commits than this are suggested for squashing.
pub const SQUASH_THRESHOLD: usize = 3;

/// Substrings (lower-case) that mark a commit subject as work in progress.
pub const WIP_MARKERS: &[&str] = &["wip", "fixme", "temp"];

/// Default deadline for long-running backend operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Id of the workspace created by bootstrap.
pub const DEFAULT_WORKSPACE_ID: &str = "general";

/// Display name of the workspace created by bootstrap.
pub const DEFAULT_WORKSPACE_NAME: &str = "General";

/// Version label for commits newer than the most recent tag.
pub const UNRELEASED: &str = "Unreleased";
