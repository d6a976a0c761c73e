//! Integration tests for the store-only `gitsem` commands.
//!
//! These run without a git repository:
//! - `gitsem init` bootstrap and re-init refusal
//! - workspace create/activate/list/add
//! - tag and impact recording
//! - `gitsem config show`

mod common;

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use common::gitsem_cmd;

fn init(dir: &Path) {
    gitsem_cmd().current_dir(dir).arg("init").assert().success();
}

fn read_meta(dir: &Path) -> Value {
    let content = fs::read_to_string(dir.join(".gitsem/meta.json")).expect("read meta.json");
    serde_json::from_str(&content).expect("parse meta.json")
}

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_creates_layout() {
    let temp = TempDir::new().expect("create temp dir");

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["init", "--name", "Payments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] Initialized gitsem"))
        .stdout(predicate::str::contains("General (general)"));

    let gitsem = temp.path().join(".gitsem");
    assert!(gitsem.join("meta.json").is_file());
    assert!(gitsem.join("schemas/meta.schema.json").is_file());
    assert!(gitsem.join("schemas/config.schema.json").is_file());

    let config = fs::read_to_string(gitsem.join("config.yml")).unwrap();
    assert!(config.starts_with("# yaml-language-server: $schema=./schemas/config.schema.json"));
    assert!(config.contains("name: Payments"));

    let meta = read_meta(temp.path());
    assert_eq!(meta["version"], 1);
    assert_eq!(meta["active_workspace"], "general");
    assert_eq!(meta["workspaces"][0]["id"], "general");
}

#[test]
fn test_second_init_fails() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_require_init() {
    let temp = TempDir::new().expect("create temp dir");

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `gitsem init` first"));

    assert!(!temp.path().join(".gitsem").exists());
}

#[test]
fn test_commands_resolve_root_from_subdirectory() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());
    let nested = temp.path().join("src/deep");
    fs::create_dir_all(&nested).unwrap();

    gitsem_cmd()
        .current_dir(&nested)
        .args(["workspace", "create", "Nested"])
        .assert()
        .success();

    let meta = read_meta(temp.path());
    assert_eq!(meta["active_workspace"], "nested");
    assert!(!nested.join(".gitsem").exists());
}

// ============================================================================
// workspaces
// ============================================================================

#[test]
fn test_workspace_create_activates_by_default() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "create", "Auth Service", "--description", "Login flow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created workspace `Auth Service` (auth-service)"));

    let output = gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["active"], "auth-service");
    let ids: Vec<&str> = listing["workspaces"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["general", "auth-service"]);
    assert_eq!(listing["workspaces"][1]["description"], "Login flow");
}

#[test]
fn test_workspace_create_without_activation() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "create", "Later", "--no-activate"])
        .assert()
        .success();

    assert_eq!(read_meta(temp.path())["active_workspace"], "general");
}

#[test]
fn test_duplicate_workspace_rejected() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "create", "general"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workspace `general` already exists"));
}

#[test]
fn test_activate_unknown_workspace_fails() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "activate", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workspace `missing` not found"));

    assert_eq!(read_meta(temp.path())["active_workspace"], "general");
}

#[test]
fn test_workspace_list_table_marks_active() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "create", "Docs", "--no-activate"])
        .assert()
        .success();

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMMITS"))
        .stdout(predicate::str::is_match(r"\*\s+general").unwrap());
}

#[test]
fn test_workspace_add_is_idempotent() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    for _ in 0..2 {
        gitsem_cmd()
            .current_dir(temp.path())
            .args(["workspace", "add", "abc1234"])
            .assert()
            .success();
    }
    gitsem_cmd()
        .current_dir(temp.path())
        .args(["workspace", "add", "def5678", "--workspace", "nope"])
        .assert()
        .failure();

    let meta = read_meta(temp.path());
    assert_eq!(meta["workspaces"][0]["commits"], serde_json::json!(["abc1234"]));
}

// ============================================================================
// tags and impacts
// ============================================================================

#[test]
fn test_tag_and_impact_are_recorded() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["tag", "abc1234", "feature"])
        .assert()
        .success();
    gitsem_cmd()
        .current_dir(temp.path())
        .args(["tag", "abc1234", "feature"])
        .assert()
        .success();
    gitsem_cmd()
        .current_dir(temp.path())
        .args(["impact", "abc1234", "minor"])
        .assert()
        .success();
    gitsem_cmd()
        .current_dir(temp.path())
        .args(["impact", "abc1234", "major"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is major"));

    let meta = read_meta(temp.path());
    assert_eq!(meta["tags"]["abc1234"], serde_json::json!(["feature"]));
    assert_eq!(meta["impacts"]["abc1234"], "major");
}

#[test]
fn test_invalid_impact_rejected_by_parser() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    gitsem_cmd()
        .current_dir(temp.path())
        .args(["impact", "abc1234", "huge"])
        .assert()
        .failure()
        .code(2);
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_show_defaults_and_flag_override() {
    let temp = TempDir::new().expect("create temp dir");
    init(temp.path());

    let output = gitsem_cmd()
        .current_dir(temp.path())
        .args(["config", "show", "--json"])
        .output()
        .unwrap();
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["global"]["backend"]["timeout_secs"], 15);
    assert_eq!(shown["global"]["history"]["log_limit"], 100);
    assert_eq!(shown["repository"]["initialized"], true);
    assert_eq!(shown["repository"]["hasGit"], false);

    let output = gitsem_cmd()
        .current_dir(temp.path())
        .args(["config", "show", "--json", "--timeout", "30"])
        .output()
        .unwrap();
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["global"]["backend"]["timeout_secs"], 30);
}

#[test]
fn test_config_file_and_env_precedence() {
    let temp = TempDir::new().expect("create temp dir");
    let config = temp.path().join("config.yaml");
    fs::write(&config, "backend:\n  timeout_secs: 40\nhistory:\n  log_limit: 7\n").unwrap();

    let output = gitsem_cmd()
        .current_dir(temp.path())
        .env("GITSEM_CONFIG", &config)
        .env("GITSEM_TIMEOUT", "5")
        .args(["config", "show", "--json"])
        .output()
        .unwrap();
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["global"]["backend"]["timeout_secs"], 5);
    assert_eq!(shown["global"]["history"]["log_limit"], 7);
    assert_eq!(shown["global"]["history"]["reflog_limit"], 50);
}

#[test]
fn test_invalid_config_fails_startup() {
    let temp = TempDir::new().expect("create temp dir");
    let config = temp.path().join("config.yaml");
    fs::write(&config, "history:\n  log_limit: 0\n").unwrap();

    gitsem_cmd()
        .current_dir(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start gitsem"))
        .stderr(predicate::str::contains("log_limit cannot be 0"));
}
