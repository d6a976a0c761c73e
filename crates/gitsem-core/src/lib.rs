//! # gitsem-core
//!
//! **Semantic metadata layer over a git working copy** – core library.
//!
//! This crate keeps a small JSON document next to a repository that groups
//! commits into named workspaces and annotates them with a change tag and a
//! release impact. It also provides the history helpers built on top of that
//! data: hygiene checks, interactive rebase plans and changelog generation.
//! It is consumed by the `gitsem` CLI.
//!
//! ## Main Types
//!
//! - [`Backend`] – capability interface over git ([`GitBackend`], [`MemoryBackend`])
//! - [`Repository`] – a resolved repository root on disk
//! - [`MetaStore`] – the persisted workspace/tag/impact document
//! - [`GitsemError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`backend`] – command execution, wire parsers and the in-memory double
//! - [`diff`] – unified diff parsing into files and hunks
//! - [`classify`] – change tag and impact detection from commit messages
//! - [`store`] – workspace metadata store
//! - [`hygiene`] – history health report
//! - [`rebase`] – rebase plan builder/executor
//! - [`changelog`] – release grouping and export
//! - [`commit`], [`staging`] – the commit workflow and staging helpers
//!
//! ## Example
//!
//! ```ignore
//! use gitsem_core::{run_commit, CommitOptions, GitBackend, MetaStore, Repository};
//! use std::path::Path;
//!
//! let repo = Repository::resolve(Path::new("."))?;
//! let store = MetaStore::new(&repo);
//! if !store.exists() {
//!     store.bootstrap()?;
//! }
//!
//! let backend = GitBackend::new(repo.root());
//! backend.stage_file("src/login.rs")?;
//! let summary = run_commit(&backend, &store, &CommitOptions {
//!     message: "feat(auth): add login".into(),
//!     impact: None,
//! })?;
//! println!("{} -> {}", summary.hash, summary.impact);
//! ```

pub mod backend;
pub mod changelog;
pub mod classify;
pub mod commit;
pub mod config;
pub mod constants;
pub mod diff;
pub mod errors;
pub mod hygiene;
pub mod rebase;
pub mod repo;
pub mod staging;
pub mod store;

pub use backend::{
    Backend, CancelToken, CommandScope, CommitRecord, FileStatusRecord, GitBackend, MemoryBackend,
    MemoryState, ReflogRecord, WorktreeRecord,
};
pub use changelog::{
    export_json, export_markdown, format_summary, ChangeEntry, Release, ReleaseGenerator,
};
pub use classify::{detect_impact, detect_tag, ChangeTag, Impact};
pub use commit::{run_commit, CommitOptions, CommitSummary};
pub use config::{BackendConfig, GlobalConfig, HistoryConfig, ProjectConfig, ProjectInfo};
pub use diff::{parse_diff, FileDiff, Hunk};
pub use errors::GitsemError;
pub use hygiene::{is_wip, HealthReport, HygieneAnalyzer};
pub use rebase::{render_todo, RebaseAction, RebasePlan, RebaseStep};
pub use repo::Repository;
pub use staging::{stage_hunk, toggle_stage};
pub use store::{workspace_id_from_name, Meta, MetaStore, Workspace};
