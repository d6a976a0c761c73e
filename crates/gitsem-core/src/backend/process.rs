//! Process-spawning backend over the `git` binary.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::errors::GitsemError;
use crate::rebase::{render_todo, RebaseStep};

use super::Backend;

/// Interval between exit polls of a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation flag for in-flight backend commands.
///
/// Cloning yields a handle to the same flag, so a caller can hand one clone
/// to a [`CommandScope`] and cancel from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounds for a single backend invocation.
///
/// On deadline expiry or cancellation the child process is killed and the
/// invocation fails with [`GitsemError::Timeout`] or [`GitsemError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CommandScope {
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl CommandScope {
    /// A scope with no deadline and a fresh cancellation token.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Captured result of a finished child.
struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// [`Backend`] implementation that runs `git` in a repository root.
#[derive(Debug, Clone)]
pub struct GitBackend {
    root: PathBuf,
    scope: CommandScope,
}

impl GitBackend {
    /// Create a backend rooted at `root` with no deadline.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scope: CommandScope::unbounded(),
        }
    }

    /// Replace the scope applied to every invocation.
    pub fn with_scope(mut self, scope: CommandScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope(&self) -> &CommandScope {
        &self.scope
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_PAGER", "cat")
            .env("PAGER", "cat")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Spawn `cmd`, optionally feed `input` on stdin, and wait within the scope.
    fn execute(
        &self,
        mut cmd: Command,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<Captured, GitsemError> {
        let command = args.join(" ");
        tracing::debug!(command = %command, root = %self.root.display(), "git");

        if self.scope.cancel.is_cancelled() {
            tracing::warn!(command = %command, "git command cancelled before start");
            return Err(GitsemError::Cancelled { command });
        }

        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| GitsemError::Spawn {
            command: command.clone(),
            message: e.to_string(),
        })?;

        let writer = match (input, child.stdin.take()) {
            (Some(text), Some(mut stdin)) => {
                let text = text.to_string();
                Some(thread::spawn(move || {
                    // A child that exits early closes the pipe; its exit status reports why.
                    let _ = stdin.write_all(text.as_bytes());
                }))
            }
            _ => None,
        };
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child, &command)?;

        if let Some(handle) = writer {
            let _ = handle.join();
        }

        Ok(Captured {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn wait(&self, child: &mut Child, command: &str) -> Result<ExitStatus, GitsemError> {
        let deadline = self.scope.timeout.map(|t| Instant::now() + t);

        loop {
            let polled = child.try_wait();
            if let Some(status) = reap_on_error(child, polled)? {
                return Ok(status);
            }

            if self.scope.cancel.is_cancelled() {
                kill(child);
                tracing::warn!(command, "git command cancelled");
                return Err(GitsemError::Cancelled {
                    command: command.to_string(),
                });
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                kill(child);
                tracing::warn!(command, "git command timed out");
                return Err(GitsemError::Timeout {
                    command: command.to_string(),
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Single-quote `s` for `sh`, escaping embedded quotes as `'\''`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Pass `result` through, killing and reaping `child` first when it is an error.
fn reap_on_error<T>(child: &mut Child, result: std::io::Result<T>) -> Result<T, GitsemError> {
    result.map_err(|e| {
        kill(child);
        GitsemError::from(e)
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl Backend for GitBackend {
    fn run(&self, args: &[&str]) -> Result<String, GitsemError> {
        let out = self.execute(self.command(args), args, None)?;
        if !out.status.success() {
            return Err(GitsemError::backend(args, &out.stderr, &out.stdout));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    fn apply_patch_to_index(&self, patch: &str) -> Result<(), GitsemError> {
        let args = ["apply", "--cached", "-"];
        let out = self.execute(self.command(&args), &args, Some(patch))?;
        if !out.status.success() {
            return Err(GitsemError::backend(&args, &out.stderr, &out.stdout));
        }
        Ok(())
    }

    fn run_interactive_rebase(&self, base: &str, steps: &[RebaseStep]) -> Result<(), GitsemError> {
        let mut scratch = tempfile::Builder::new()
            .prefix("gitsem-rebase-")
            .suffix(".todo")
            .tempfile()?;
        scratch.write_all(render_todo(steps).as_bytes())?;
        scratch.flush()?;

        let editor = format!("cp {}", shell_quote(&scratch.path().display().to_string()));
        let args = ["rebase", "-i", base];
        let mut cmd = self.command(&args);
        cmd.env("GIT_SEQUENCE_EDITOR", editor).env("GIT_EDITOR", "true");

        let out = self.execute(cmd, &args, None)?;
        if !out.status.success() {
            return Err(GitsemError::RebaseFailed {
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        tracing::info!(base, steps = steps.len(), "Interactive rebase completed");
        Ok(())
    }
}
