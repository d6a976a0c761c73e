//! Shared test utilities for gitsem-cli integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;

/// Get a Command for the gitsem binary, isolated from the user's environment.
///
/// Colors are disabled and the global config points at a path that does not
/// exist, so built-in defaults apply.
#[allow(deprecated)]
pub fn gitsem_cmd() -> Command {
    let mut cmd = Command::cargo_bin("gitsem").expect("gitsem binary should exist");
    cmd.env_remove("GITSEM_VERBOSE")
        .env_remove("GITSEM_TIMEOUT")
        .env("GITSEM_COLOR", "never")
        .env("GITSEM_CONFIG", "/nonexistent/gitsem/config.yaml");
    cmd
}

pub fn git_available() -> bool {
    StdCommand::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a git repository on `main` with a local identity.
pub fn init_git_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}
