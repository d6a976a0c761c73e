//! CLI definition and command dispatch for gitsem.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to `gitsem-core`.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (`--config`, `--verbose`, `--color`, `--timeout`)
//! 2. Environment variables (`GITSEM_CONFIG`, `GITSEM_VERBOSE`, `GITSEM_COLOR`, `GITSEM_TIMEOUT`)
//! 3. Config file (`~/.gitsem/config.yaml` or the path from `--config`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::ui::color::terminal_width;
use crate::ui::format::{line_stats, pluralize};
use crate::ui::table::{self, LogRow};
use crate::ui::{ColorMode, MessageType, Style};

use gitsem_core::constants::UNRELEASED;
use gitsem_core::{
    export_json, export_markdown, format_summary, parse_diff, run_commit, stage_hunk,
    toggle_stage, workspace_id_from_name, Backend, CommandScope, CommitOptions, GitBackend,
    GitsemError, GlobalConfig, HygieneAnalyzer, Impact, Meta, MetaStore, ProjectConfig,
    ProjectInfo, RebaseAction, RebasePlan, ReleaseGenerator, Repository,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// gitsem – semantic workspaces, tags and impacts over git history
#[derive(Parser, Debug)]
#[command(name = "gitsem")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "GITSEM_VERBOSE")]
    pub verbose: bool,

    /// Path to configuration file (default: ~/.gitsem/config.yaml)
    #[arg(long, global = true, env = "GITSEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, env = "GITSEM_COLOR", value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Deadline for each git invocation in seconds (0 disables it)
    #[arg(long, global = true, env = "GITSEM_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.gitsem/` with the default workspace and project config
    #[command(after_help = r#"EXAMPLES:
    # Initialize in the current repository
    gitsem init

    # Set the project name shown in exports
    gitsem init --name "Payments API" --description "Billing backend"
"#)]
    Init {
        /// Project name (default: the repository directory name)
        #[arg(long)]
        name: Option<String>,

        /// Project description
        #[arg(long)]
        description: Option<String>,
    },

    /// Show branch, active workspace and working tree changes
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show recent commits with their tag, impact and workspace
    #[command(after_help = r#"EXAMPLES:
    # Last 100 commits (history.log_limit)
    gitsem log

    # Last 10 commits as JSON
    gitsem log -n 10 --json
"#)]
    Log {
        /// Number of commits to show (default: history.log_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show recent reference movements
    Reflog {
        /// Number of entries to show (default: history.reflog_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage git worktrees
    Worktree {
        #[command(subcommand)]
        action: WorktreeAction,
    },

    /// Manage semantic workspaces
    #[command(after_help = r#"EXAMPLES:
    # Create and activate a workspace (id: auth-service)
    gitsem workspace create "Auth Service"

    # Switch back to the default workspace
    gitsem workspace activate general

    # Attach an existing commit to the active workspace
    gitsem workspace add 3f2c9e1
"#)]
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },

    /// Attach a change tag to a commit
    Tag {
        /// Commit hash
        hash: String,

        /// Tag (feature, fix, refactor, docs, test, chore, or any label)
        tag: String,
    },

    /// Record the release impact of a commit
    Impact {
        /// Commit hash
        hash: String,

        /// Impact level: patch, minor or major
        impact: Impact,
    },

    /// Commit staged changes and record their tag, workspace and impact
    #[command(after_help = r#"EXAMPLES:
    # Tag and impact are detected from the message
    gitsem commit -m "feat(auth): add login"

    # Override the detected impact
    gitsem commit -m "refactor: rename config keys" --impact major
"#)]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Override the impact detected from the message
        #[arg(long)]
        impact: Option<Impact>,
    },

    /// List the hunks of a file's diff
    Diff {
        /// File path relative to the repository root
        path: String,

        /// Diff the index instead of the working tree
        #[arg(long)]
        staged: bool,

        /// Print the raw diff text
        #[arg(long, conflicts_with = "json")]
        raw: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Stage one hunk of a file (numbered as in `gitsem diff`)
    #[command(name = "stage-hunk", after_help = r#"EXAMPLES:
    # List hunks, then stage the second one
    gitsem diff src/lib.rs
    gitsem stage-hunk src/lib.rs 2
"#)]
    StageHunk {
        /// File path relative to the repository root
        path: String,

        /// Hunk number, starting at 1
        index: usize,
    },

    /// Stage files
    Stage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Unstage files
    Unstage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Stage a changed file if it is unstaged, unstage it otherwise
    Toggle {
        path: String,
    },

    /// Hard reset to a commit or reflog selector
    Reset {
        /// Commit hash or selector such as `HEAD@{2}`
        target: String,

        /// Confirm discarding uncommitted changes
        #[arg(long)]
        yes: bool,
    },

    /// Plan and run interactive rebases
    Rebase {
        #[command(subcommand)]
        action: RebaseCommand,
    },

    /// Report WIP commits, oversized and stale workspaces, and a dirty tree
    Hygiene {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Group history into releases by tag
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorktreeAction {
    /// List worktrees; the main one is marked with `*`
    List {
        #[arg(long)]
        json: bool,
    },

    /// Check out a branch into a new worktree
    Add { path: String, branch: String },

    /// Remove a worktree
    Remove {
        path: String,

        /// Remove even with uncommitted changes
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceAction {
    /// List workspaces; the active one is marked with `*`
    List {
        #[arg(long)]
        json: bool,
    },

    /// Create a workspace from a display name and activate it
    Create {
        /// Display name; the id is derived from it
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Keep the current active workspace
        #[arg(long)]
        no_activate: bool,
    },

    /// Make a workspace active
    Activate { id: String },

    /// Add a commit to a workspace
    Add {
        /// Commit hash
        hash: String,

        /// Workspace id (default: the active workspace)
        #[arg(short, long)]
        workspace: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RebaseCommand {
    /// Show the default plan for the commits after BASE
    Plan {
        base: String,

        #[arg(long)]
        json: bool,
    },

    /// Edit the plan for the commits after BASE and run it
    #[command(after_help = r#"EXAMPLES:
    # Move step 1 below step 2, then squash step 3 into its predecessor
    gitsem rebase run main~3 --swap 1 --set 3=squash

    # Preview the todo without rebasing
    gitsem rebase run main~3 --set 2=drop --dry-run
"#)]
    Run {
        base: String,

        /// Swap step N with step N+1 (applied in order, before --set)
        #[arg(long = "swap", value_name = "N")]
        swaps: Vec<usize>,

        /// Set the action of step N (pick, squash, fixup, edit, drop, reword)
        #[arg(long = "set", value_name = "N=ACTION", value_parser = parse_step_action)]
        actions: Vec<(usize, RebaseAction)>,

        /// Print the resulting todo instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Continue a stopped rebase
    Continue,

    /// Abort a stopped rebase
    Abort,

    /// Skip the current patch of a stopped rebase
    Skip,

    /// Report whether a rebase is in progress
    Status {
        #[arg(long)]
        json: bool,
    },
}

/// Selects a single release instead of the full history.
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Exclusive lower bound; selects a single release (empty for all history)
    #[arg(long)]
    from: Option<String>,

    /// Inclusive upper bound, used with --from
    #[arg(long, default_value = "HEAD")]
    to: String,

    /// Release label, used with --from
    #[arg(long = "label", default_value = UNRELEASED)]
    label: String,
}

#[derive(Subcommand, Debug)]
pub enum ReleaseAction {
    /// Plain-text summary
    Summary {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Markdown summary
    #[command(after_help = r#"EXAMPLES:
    # Print to stdout
    gitsem release markdown

    # Write to .gitsem/release.md
    gitsem release markdown --write
"#)]
    Markdown {
        #[command(flatten)]
        range: RangeArgs,

        /// Write to .gitsem/release.md
        #[arg(long)]
        write: bool,

        /// Write to this path instead
        #[arg(short, long, conflicts_with = "write")]
        output: Option<PathBuf>,
    },

    /// JSON export
    Json {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show resolved configuration (merged from all sources)
    Show {
        #[arg(long)]
        json: bool,
    },
}

/// Parse `N=ACTION` for `rebase run --set`.
fn parse_step_action(s: &str) -> Result<(usize, RebaseAction), String> {
    let (step, action) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=ACTION, got `{}`", s))?;
    let step: usize = step
        .trim()
        .parse()
        .map_err(|_| format!("invalid step number `{}`", step))?;
    let action = action.parse::<RebaseAction>().map_err(|e| e.to_string())?;
    Ok((step, action))
}

// ============================================================================
// Context
// ============================================================================

/// Resolved state shared by every command handler.
struct Context {
    style: Style,
    config: GlobalConfig,
    config_path: Option<PathBuf>,
    repo: Repository,
    backend: GitBackend,
    store: MetaStore,
}

impl Context {
    fn load(cli: &Cli, style: Style) -> Result<Self> {
        let config_path = cli.config.clone().or_else(GlobalConfig::default_path);
        let mut config = match &config_path {
            Some(path) => GlobalConfig::from_path(path)?,
            None => GlobalConfig::default(),
        };
        if let Some(secs) = cli.timeout {
            config.backend.timeout_secs = secs;
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let repo = Repository::resolve(&cwd)?;

        let scope = CommandScope {
            timeout: config.backend.timeout(),
            ..CommandScope::default()
        };
        let backend = GitBackend::new(repo.root()).with_scope(scope);
        let store = MetaStore::new(&repo);

        tracing::debug!(
            root = %repo.root().display(),
            timeout_secs = config.backend.timeout_secs,
            "Resolved repository"
        );

        Ok(Self {
            style,
            config,
            config_path,
            repo,
            backend,
            store,
        })
    }

    /// Metadata for commands that write to it or depend on workspaces.
    fn meta(&self) -> Result<Meta> {
        if !self.store.exists() {
            bail!(
                "gitsem is not initialized in {}. Run `gitsem init` first.",
                self.repo.root().display()
            );
        }
        Ok(self.store.load()?)
    }

    fn ok(&self, text: &str) {
        println!("{}", self.style.message(MessageType::Ok, text));
    }

    fn info(&self, text: &str) {
        println!("{}", self.style.message(MessageType::Info, text));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always; debug with --verbose. Logs go to stderr so --json stays parseable.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("gitsem_core={},gitsem_cli={}", log_level, log_level);

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);

    let ctx = match Context::load(&cli, style.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your global config at ~/.gitsem/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context("Failed to start gitsem", Some(&format!("{:#}", e)), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Init { name, description } => handle_init(&ctx, name, description),
        Command::Status { json } => handle_status(&ctx, json),
        Command::Log { limit, json } => handle_log(&ctx, limit, json),
        Command::Reflog { limit, json } => handle_reflog(&ctx, limit, json),
        Command::Worktree { action } => handle_worktree(&ctx, action),
        Command::Workspace { action } => handle_workspace(&ctx, action),
        Command::Tag { hash, tag } => handle_tag(&ctx, &hash, &tag),
        Command::Impact { hash, impact } => handle_impact(&ctx, &hash, impact),
        Command::Commit { message, impact } => handle_commit(&ctx, message, impact),
        Command::Diff {
            path,
            staged,
            raw,
            json,
        } => handle_diff(&ctx, &path, staged, raw, json),
        Command::StageHunk { path, index } => handle_stage_hunk(&ctx, &path, index),
        Command::Stage { paths } => handle_stage(&ctx, &paths, true),
        Command::Unstage { paths } => handle_stage(&ctx, &paths, false),
        Command::Toggle { path } => handle_toggle(&ctx, &path),
        Command::Reset { target, yes } => handle_reset(&ctx, &target, yes),
        Command::Rebase { action } => handle_rebase(&ctx, action),
        Command::Hygiene { json } => handle_hygiene(&ctx, json),
        Command::Release { action } => handle_release(&ctx, action),
        Command::Config { action } => handle_config(&ctx, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_init(ctx: &Context, name: Option<String>, description: Option<String>) -> Result<()> {
    let style = &ctx.style;

    if !ctx.repo.has_git() {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                "No git repository found; history commands will fail until one exists"
            )
        );
    }

    let meta = ctx.store.bootstrap()?;

    let config_path = ctx.repo.config_path();
    if !config_path.exists() {
        let default_name = ctx
            .repo
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let config = ProjectConfig {
            project: ProjectInfo {
                name: name.unwrap_or(default_name),
                description: description.unwrap_or_default(),
            },
            ..ProjectConfig::default()
        };
        config.save(&config_path)?;
    }

    ctx.ok(&format!(
        "Initialized gitsem at {}",
        style.file_path(&ctx.repo.gitsem_dir().display().to_string())
    ));
    println!(
        "{}",
        style.message_detail(
            "Workspace",
            &format!("{} ({})", meta.active_workspace_name(), meta.active_workspace)
        )
    );

    println!();
    println!("{}", style.message(MessageType::Hint, "Next steps:"));
    println!("  1. Create a workspace:  gitsem workspace create \"My Feature\"");
    println!("  2. Stage your changes:  gitsem stage <path>");
    println!("  3. Commit semantically: gitsem commit -m \"feat: ...\"");
    Ok(())
}

fn handle_status(ctx: &Context, json: bool) -> Result<()> {
    let style = &ctx.style;
    let branch = ctx.backend.current_branch()?;
    let files = ctx.backend.parse_status()?;
    let rebasing = ctx.backend.is_rebasing();
    let meta = ctx.store.load()?;

    if json {
        return print_json(&serde_json::json!({
            "branch": branch,
            "activeWorkspace": meta.active_workspace,
            "rebasing": rebasing,
            "files": files,
        }));
    }

    println!("{}", style.key_value("Branch", &branch));
    let workspace = match meta.active() {
        Some(ws) => format!("{} ({})", ws.name, ws.id),
        None => "-".to_string(),
    };
    println!("{}", style.key_value("Workspace", &workspace));

    if rebasing {
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                "Rebase in progress (gitsem rebase continue | skip | abort)"
            )
        );
    }

    if files.is_empty() {
        println!();
        ctx.info("Working tree clean");
        return Ok(());
    }

    let (staged, unstaged): (Vec<_>, Vec<_>) = files.iter().partition(|f| f.staged);
    if !staged.is_empty() {
        println!();
        println!("{}", style.section("Staged changes:"));
        for file in staged {
            println!("{}", style.file_status(file));
        }
    }
    if !unstaged.is_empty() {
        println!();
        println!("{}", style.section("Unstaged changes:"));
        for file in unstaged {
            println!("{}", style.file_status(file));
        }
    }
    Ok(())
}

fn handle_log(ctx: &Context, limit: Option<usize>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.history.log_limit);
    let commits = ctx.backend.log(limit)?;
    let meta = ctx.store.load()?;

    let rows: Vec<LogRow> = commits
        .into_iter()
        .map(|c| LogRow {
            tag: meta.first_tag(&c.hash).map(str::to_string),
            impact: meta.impacts.get(&c.hash).copied(),
            workspace: meta.workspace_for_commit(&c.hash).map(|w| w.name.clone()),
            hash: c.hash,
            short_hash: c.short_hash,
            author: c.author,
            date: c.date,
            subject: c.subject,
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        ctx.info("No commits yet");
        return Ok(());
    }

    let subject_width = terminal_width().saturating_sub(60).max(20);
    println!("{}", table::render_log_table(&rows, subject_width));
    Ok(())
}

fn handle_reflog(ctx: &Context, limit: Option<usize>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.history.reflog_limit);
    let entries = ctx.backend.reflog(limit)?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        ctx.info("Reflog is empty");
        return Ok(());
    }
    println!("{}", table::render_reflog_table(&entries));
    Ok(())
}

fn handle_worktree(ctx: &Context, action: WorktreeAction) -> Result<()> {
    match action {
        WorktreeAction::List { json } => {
            let worktrees = ctx.backend.list_worktrees()?;
            if json {
                return print_json(&worktrees);
            }
            println!("{}", table::render_worktree_table(&worktrees));
        }
        WorktreeAction::Add { path, branch } => {
            ctx.backend.add_worktree(&path, &branch)?;
            ctx.ok(&format!(
                "Checked out `{}` into {}",
                branch,
                ctx.style.file_path(&path)
            ));
        }
        WorktreeAction::Remove { path, force } => {
            ctx.backend.remove_worktree(&path, force)?;
            ctx.ok(&format!("Removed worktree {}", ctx.style.file_path(&path)));
        }
    }
    Ok(())
}

fn handle_workspace(ctx: &Context, action: WorkspaceAction) -> Result<()> {
    let style = &ctx.style;

    match action {
        WorkspaceAction::List { json } => {
            let meta = ctx.meta()?;
            if json {
                return print_json(&serde_json::json!({
                    "active": meta.active_workspace,
                    "workspaces": meta.workspaces,
                }));
            }
            if meta.workspaces.is_empty() {
                ctx.info("No workspaces");
                return Ok(());
            }
            println!(
                "{}",
                table::render_workspace_table(&meta.workspaces, &meta.active_workspace)
            );
        }
        WorkspaceAction::Create {
            name,
            description,
            no_activate,
        } => {
            ctx.meta()?;
            if workspace_id_from_name(&name).is_empty() {
                bail!("Workspace name must not be empty");
            }
            let workspace = ctx
                .store
                .create_workspace_from_name(&name, &description, !no_activate)?;
            ctx.ok(&format!(
                "Created workspace `{}` ({})",
                workspace.name, workspace.id
            ));
            if !no_activate {
                println!("{}", style.message_detail("Active", &workspace.id));
            }
        }
        WorkspaceAction::Activate { id } => {
            ctx.meta()?;
            ctx.store.set_active_workspace(&id)?;
            ctx.ok(&format!("Active workspace is now `{}`", id));
        }
        WorkspaceAction::Add { hash, workspace } => {
            let meta = ctx.meta()?;
            let id = match workspace {
                Some(id) => id,
                None if !meta.active_workspace.is_empty() => meta.active_workspace.clone(),
                None => bail!("No active workspace. Pass --workspace <id>."),
            };
            ctx.store.add_commit_to_workspace(&id, &hash)?;
            ctx.ok(&format!(
                "Added {} to workspace `{}`",
                style.revision(&hash),
                id
            ));
        }
    }
    Ok(())
}

fn handle_tag(ctx: &Context, hash: &str, tag: &str) -> Result<()> {
    ctx.meta()?;
    ctx.store.add_tag(hash, tag)?;
    ctx.ok(&format!(
        "Tagged {} as `{}`",
        ctx.style.revision(hash),
        tag.trim()
    ));
    Ok(())
}

fn handle_impact(ctx: &Context, hash: &str, impact: Impact) -> Result<()> {
    ctx.meta()?;
    ctx.store.add_impact(hash, impact)?;
    ctx.ok(&format!(
        "Impact of {} is {}",
        ctx.style.revision(hash),
        ctx.style.impact(impact)
    ));
    Ok(())
}

fn handle_commit(ctx: &Context, message: String, impact: Option<Impact>) -> Result<()> {
    let style = &ctx.style;
    ctx.meta()?;

    let summary = run_commit(&ctx.backend, &ctx.store, &CommitOptions { message, impact })?;

    ctx.ok(&format!("Committed {}", style.revision(&summary.hash)));
    println!("{}", style.message_detail("Tag", summary.tag.as_str()));
    println!("{}", style.message_detail("Impact", &style.impact(summary.impact)));
    if let Some(workspace) = &summary.workspace {
        println!("{}", style.message_detail("Workspace", workspace));
    }
    Ok(())
}

fn handle_diff(ctx: &Context, path: &str, staged: bool, raw: bool, json: bool) -> Result<()> {
    let text = ctx.backend.diff(path, staged)?;
    if raw {
        print!("{}", text);
        return Ok(());
    }

    let files = parse_diff(&text);
    if json {
        return print_json(&files);
    }
    if files.iter().all(|f| f.hunks.is_empty()) {
        ctx.info(&format!("No {} changes in {}", if staged { "staged" } else { "unstaged" }, path));
        return Ok(());
    }
    println!("{}", table::render_hunk_table(&files));
    Ok(())
}

fn handle_stage_hunk(ctx: &Context, path: &str, index: usize) -> Result<()> {
    let files = parse_diff(&ctx.backend.diff(path, false)?);
    let Some(file) = files.iter().find(|f| f.path == path).or(files.first()) else {
        bail!("No unstaged changes in {}", path);
    };

    let hunk = index
        .checked_sub(1)
        .and_then(|i| file.hunks.get(i))
        .with_context(|| {
            format!(
                "Hunk {} out of range ({} has {})",
                index,
                file.path,
                pluralize(file.hunks.len(), "hunk")
            )
        })?;

    stage_hunk(&ctx.backend, hunk, &file.path)?;
    ctx.ok(&format!(
        "Staged hunk {} of {} ({})",
        index,
        ctx.style.file_path(&file.path),
        line_stats(hunk.line_stats())
    ));
    Ok(())
}

fn handle_stage(ctx: &Context, paths: &[String], stage: bool) -> Result<()> {
    for path in paths {
        if stage {
            ctx.backend.stage_file(path)?;
        } else {
            ctx.backend.unstage_file(path)?;
        }
    }
    let verb = if stage { "Staged" } else { "Unstaged" };
    ctx.ok(&format!("{} {}", verb, pluralize(paths.len(), "path")));
    Ok(())
}

fn handle_toggle(ctx: &Context, path: &str) -> Result<()> {
    let files = ctx.backend.parse_status()?;
    let file = files
        .iter()
        .find(|f| f.path == path)
        .with_context(|| format!("{} has no changes", path))?;

    let staged = toggle_stage(&ctx.backend, file)?;
    let verb = if staged { "Staged" } else { "Unstaged" };
    ctx.ok(&format!("{} {}", verb, ctx.style.file_path(path)));
    Ok(())
}

fn handle_reset(ctx: &Context, target: &str, yes: bool) -> Result<()> {
    if !yes {
        eprintln!(
            "{}",
            ctx.style.error_with_context(
                &format!("Refusing to hard reset to `{}`", target),
                Some("uncommitted changes would be lost"),
                Some("Re-run with --yes to confirm"),
            )
        );
        bail!("Reset not confirmed");
    }

    ctx.backend.reset_to(target)?;
    let head = ctx.backend.last_commit_hash()?;
    ctx.ok(&format!("HEAD is now at {}", ctx.style.revision(&head)));
    Ok(())
}

fn handle_rebase(ctx: &Context, action: RebaseCommand) -> Result<()> {
    let style = &ctx.style;

    match action {
        RebaseCommand::Plan { base, json } => {
            let plan = RebasePlan::build(&ctx.backend, &base)?;
            if json {
                return print_json(&plan);
            }
            if plan.is_empty() {
                ctx.info(&format!("No commits after `{}`", base));
                return Ok(());
            }
            println!("{}", table::render_plan_table(&plan));
        }
        RebaseCommand::Run {
            base,
            swaps,
            actions,
            dry_run,
        } => {
            let mut plan = RebasePlan::build(&ctx.backend, &base)?;
            for n in swaps {
                plan.swap_with_next(step_index(n, plan.len())?)?;
            }
            for (n, action) in actions {
                plan.set_action(step_index(n, plan.len())?, action)?;
            }

            if dry_run {
                print!("{}", plan.todo());
                return Ok(());
            }

            match plan.execute(&ctx.backend) {
                Ok(()) => ctx.ok(&format!(
                    "Rebased {} onto `{}`",
                    pluralize(plan.len(), "commit"),
                    base
                )),
                Err(GitsemError::RebaseFailed { stderr }) => {
                    eprintln!(
                        "{}",
                        style.error_with_context(
                            "Rebase stopped",
                            Some(stderr.lines().next().unwrap_or("conflict")),
                            Some("Resolve, then run `gitsem rebase continue`, `skip` or `abort`"),
                        )
                    );
                    bail!("Rebase did not complete");
                }
                Err(e) => return Err(e.into()),
            }
        }
        RebaseCommand::Continue => {
            ctx.backend.rebase_continue()?;
            ctx.ok("Rebase continued");
        }
        RebaseCommand::Abort => {
            ctx.backend.rebase_abort()?;
            ctx.ok("Rebase aborted");
        }
        RebaseCommand::Skip => {
            ctx.backend.rebase_skip()?;
            ctx.ok("Skipped current patch");
        }
        RebaseCommand::Status { json } => {
            let rebasing = ctx.backend.is_rebasing();
            if json {
                return print_json(&serde_json::json!({ "rebasing": rebasing }));
            }
            if rebasing {
                println!("{}", style.message(MessageType::Warn, "Rebase in progress"));
            } else {
                ctx.info("No rebase in progress");
            }
        }
    }
    Ok(())
}

/// Convert a 1-based step number from the command line.
fn step_index(n: usize, len: usize) -> Result<usize, GitsemError> {
    n.checked_sub(1)
        .ok_or(GitsemError::InvalidStepIndex { index: n, len })
}

fn handle_hygiene(ctx: &Context, json: bool) -> Result<()> {
    let style = &ctx.style;
    let meta = ctx.meta()?;
    let report = HygieneAnalyzer::new(&ctx.backend, &meta).report()?;

    if json {
        return print_json(&report);
    }
    if report.is_clean() {
        ctx.ok("Repository is healthy");
        return Ok(());
    }

    if report.dirty {
        println!(
            "{}",
            style.message(MessageType::Warn, "Working tree has uncommitted changes")
        );
    }
    if !report.wip_commits.is_empty() {
        println!("{}", style.message(MessageType::Warn, "WIP commits in recent history:"));
        for subject in &report.wip_commits {
            println!("{}", style.list_item("-", subject));
        }
    }
    if !report.squash_suggestions.is_empty() {
        println!("{}", style.message(MessageType::Hint, "Consider squashing:"));
        for name in &report.squash_suggestions {
            println!("{}", style.list_item("-", name));
        }
    }
    if !report.stale_workspaces.is_empty() {
        println!(
            "{}",
            style.message(MessageType::Warn, "Workspaces referencing unreachable commits:")
        );
        for name in &report.stale_workspaces {
            println!("{}", style.list_item("-", name));
        }
    }
    Ok(())
}

fn handle_release(ctx: &Context, action: ReleaseAction) -> Result<()> {
    let meta = ctx.store.load()?;
    let generator = ReleaseGenerator::new(&ctx.backend, &meta);

    let releases = |range: &RangeArgs| -> Result<_> {
        Ok(match &range.from {
            Some(from) => vec![generator.generate_release(&range.label, from, &range.to)?],
            None => generator.generate_full()?,
        })
    };

    match action {
        ReleaseAction::Summary { range } => {
            print!("{}", format_summary(&releases(&range)?));
        }
        ReleaseAction::Markdown {
            range,
            write,
            output,
        } => {
            let releases = releases(&range)?;
            let path = match output {
                Some(path) => Some(path),
                None if write => Some(ctx.repo.release_export_path()),
                None => None,
            };
            match path {
                Some(path) => {
                    generator.write_markdown(&releases, &path)?;
                    ctx.ok(&format!(
                        "Wrote {}",
                        ctx.style.file_path(&path.display().to_string())
                    ));
                }
                None => print!("{}", export_markdown(&releases)),
            }
        }
        ReleaseAction::Json { range } => {
            println!("{}", export_json(&releases(&range)?)?);
        }
    }
    Ok(())
}

fn handle_config(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { json } => handle_config_show(ctx, json),
    }
}

/// Show the resolved global config, the project config and repository paths.
fn handle_config_show(ctx: &Context, json: bool) -> Result<()> {
    let style = &ctx.style;
    let project = ProjectConfig::from_path(&ctx.repo.config_path())?;
    let config_path = ctx
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    if json {
        return print_json(&serde_json::json!({
            "globalConfigPath": config_path,
            "global": ctx.config,
            "project": project,
            "repository": {
                "root": ctx.repo.root(),
                "hasGit": ctx.repo.has_git(),
                "initialized": ctx.repo.is_initialized(),
            },
        }));
    }

    println!("{}", style.section("GLOBAL"));
    println!("{}", style.key_value("  File", &config_path));
    println!(
        "{}",
        style.key_value("  backend.timeout_secs", &ctx.config.backend.timeout_secs.to_string())
    );
    println!(
        "{}",
        style.key_value("  history.log_limit", &ctx.config.history.log_limit.to_string())
    );
    println!(
        "{}",
        style.key_value(
            "  history.reflog_limit",
            &ctx.config.history.reflog_limit.to_string()
        )
    );
    println!();
    println!("{}", style.section("PROJECT"));
    println!("{}", style.key_value("  name", &project.project.name));
    println!("{}", style.key_value("  description", &project.project.description));
    println!();
    println!("{}", style.section("REPOSITORY"));
    println!(
        "{}",
        style.key_value("  root", &ctx.repo.root().display().to_string())
    );
    println!(
        "{}",
        style.key_value("  initialized", &ctx.repo.is_initialized().to_string())
    );
    Ok(())
}
