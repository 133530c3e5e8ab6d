//! CLI integration tests for tsk
//!
//! These tests verify the complete workflow from initialization through
//! task management, ensuring commands work together correctly.

use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a command instance for the tsk binary
fn tsk_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tsk"));
    cmd.env_remove("TSK_LOG");
    cmd
}

/// Create a temporary directory and initialize a tracker
fn setup_tracker() -> TempDir {
    let dir = TempDir::new().unwrap();
    tsk_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

/// Runs a command with JSON output and parses stdout
fn json(dir: &TempDir, args: &[&str]) -> Value {
    let output = tsk_cmd()
        .current_dir(dir.path())
        .args(["--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "tsk {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Adds a task and returns its full ID
fn add(dir: &TempDir, title: &str, extra: &[&str]) -> String {
    let mut args = vec!["add", title, "-d", "details"];
    args.extend_from_slice(extra);
    json(dir, &args)["id"].as_str().unwrap().to_string()
}

fn titles(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    tsk_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tsk tracker"));

    assert!(dir.path().join(".tsk").is_dir());
    assert!(dir.path().join(".tsk/config.toml").is_file());
    assert!(dir.path().join(".tsk/.gitignore").is_file());
    assert!(dir.path().join(".tsk/tasks.db").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    tsk_cmd().arg("init").arg(dir.path()).assert().success();
    tsk_cmd().arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_outside_tracker_fail() {
    let dir = TempDir::new().unwrap();

    tsk_cmd()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tsk init"));
}

#[test]
fn test_commands_work_from_subdirectory() {
    let dir = setup_tracker();
    let sub = dir.path().join("src").join("deep");
    std::fs::create_dir_all(&sub).unwrap();

    tsk_cmd()
        .current_dir(&sub)
        .args(["add", "From below", "-d", "found the tracker"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_add_creates_inbox_task() {
    let dir = setup_tracker();

    let task = json(
        &dir,
        &[
            "add", "Fix leak", "-d", "leaks memory", "-k", "bug", "-p", "high", "-t", "mem,perf",
            "--source", "src/pool.rs:42",
        ],
    );

    let id = task["id"].as_str().unwrap();
    assert_eq!(id.len(), 40);
    assert!(id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    assert_eq!(task["state"], "INBOX");
    assert_eq!(task["kind"], "BUG");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["tags"], serde_json::json!(["mem", "perf"]));
    assert_eq!(task["source"], "src/pool.rs:42");
}

#[test]
fn test_add_rejects_blank_title_and_bad_kind() {
    let dir = setup_tracker();

    tsk_cmd()
        .current_dir(dir.path())
        .args(["add", "   ", "-d", "details"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title must not be empty"));

    tsk_cmd()
        .current_dir(dir.path())
        .args(["add", "Title", "-d", "details", "-k", "epic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid kind 'epic'"));

    assert_eq!(json(&dir, &["list", "--all"]), serde_json::json!([]));
}

#[test]
fn test_show_accepts_short_id() {
    let dir = setup_tracker();
    let id = add(&dir, "Show me", &[]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["show", &id[..7]])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Show me"))
        .stdout(predicate::str::contains(format!("Task: {}", id)));
}

#[test]
fn test_unknown_id_is_not_found() {
    let dir = setup_tracker();
    add(&dir, "Exists", &[]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["show", "ffff0000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No task matches"));
}

#[test]
fn test_edit_changes_fields() {
    let dir = setup_tracker();
    let id = add(&dir, "Old title", &[]);

    let task = json(
        &dir,
        &["edit", &id, "--title", "New title", "-p", "low", "--tags", "ui"],
    );
    assert_eq!(task["title"], "New title");
    assert_eq!(task["priority"], "low");
    assert_eq!(task["tags"], serde_json::json!(["ui"]));

    tsk_cmd()
        .current_dir(dir.path())
        .args(["edit", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_delete_removes_task() {
    let dir = setup_tracker();
    let id = add(&dir, "Short lived", &[]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted task"));

    tsk_cmd()
        .current_dir(dir.path())
        .args(["show", &id])
        .assert()
        .failure();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_lifecycle_shortcuts() {
    let dir = setup_tracker();
    let id = add(&dir, "Fix leak", &[]);

    assert_eq!(json(&dir, &["accept", &id])["state"], "NEW");
    assert_eq!(json(&dir, &["start", &id])["state"], "IN_PROGRESS");
    assert_eq!(json(&dir, &["done", &id])["state"], "DONE");
    assert_eq!(json(&dir, &["reopen", &id])["state"], "IN_PROGRESS");
    assert_eq!(json(&dir, &["cancel", &id])["state"], "CANCELLED");
    assert_eq!(json(&dir, &["reopen", &id])["state"], "NEW");
}

#[test]
fn test_illegal_transition_is_rejected() {
    let dir = setup_tracker();
    let id = add(&dir, "Untriaged", &[]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["done", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot move a task from INBOX to DONE"));

    tsk_cmd()
        .current_dir(dir.path())
        .args(["reopen", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only DONE or CANCELLED"));
}

#[test]
fn test_reject_is_terminal() {
    let dir = setup_tracker();
    let id = add(&dir, "Not a bug", &[]);

    assert_eq!(json(&dir, &["reject", &id])["state"], "INVALID");

    tsk_cmd()
        .current_dir(dir.path())
        .args(["move", &id, "new"])
        .assert()
        .failure();
}

#[test]
fn test_parent_waits_for_subtasks() {
    let dir = setup_tracker();
    let parent = add(&dir, "Parent", &["-k", "feature"]);
    let child = json(&dir, &["add-subtask", &parent[..7], "Child", "-d", "part of it"]);
    let child = child["id"].as_str().unwrap().to_string();

    json(&dir, &["accept", &parent]);
    json(&dir, &["accept", &child]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["done", &parent])
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!("Child task {} is still NEW", &child[..7])));

    json(&dir, &["done", &child]);
    assert_eq!(json(&dir, &["done", &parent])["state"], "DONE");

    let children = json(&dir, &["children", &parent]);
    assert_eq!(titles(&children), vec!["Child"]);
}

// =============================================================================
// Blocking Tests
// =============================================================================

#[test]
fn test_block_and_unblock() {
    let dir = setup_tracker();
    let x = add(&dir, "X", &[]);
    let y = add(&dir, "Y", &[]);

    let blocked = json(&dir, &["block", &x, &y]);
    assert_eq!(blocked["blocked_by"], y.as_str());

    let shown = json(&dir, &["show", &x]);
    assert_eq!(shown["task"]["blocked_by"], y.as_str());
    assert_eq!(shown["blocker"]["title"], "Y");

    json(&dir, &["unblock", &x]);
    let shown = json(&dir, &["show", &x]);
    assert!(shown["task"].get("blocked_by").is_none());

    // Unblocking again is fine
    json(&dir, &["unblock", &x]);
}

#[test]
fn test_self_block_fails() {
    let dir = setup_tracker();
    let x = add(&dir, "X", &[]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["block", &x, &x[..7]])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot block itself"));
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_list_default_visibility() {
    let dir = setup_tracker();
    add(&dir, "Inbox task", &[]);
    let active = add(&dir, "Active task", &[]);
    let finished = add(&dir, "Finished task", &[]);
    json(&dir, &["accept", &active]);
    json(&dir, &["accept", &finished]);
    json(&dir, &["done", &finished]);

    assert_eq!(titles(&json(&dir, &["list"])), vec!["Active task"]);
    assert_eq!(
        titles(&json(&dir, &["list", "--show-done"])),
        vec!["Active task", "Finished task"]
    );
    assert_eq!(titles(&json(&dir, &["inbox"])), vec!["Inbox task"]);
    assert_eq!(json(&dir, &["list", "--all"]).as_array().unwrap().len(), 3);
}

#[test]
fn test_list_text_output() {
    let dir = setup_tracker();
    let id = add(&dir, "Visible", &[]);
    json(&dir, &["accept", &id]);

    tsk_cmd()
        .current_dir(dir.path())
        .args(["--format", "text", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id[..7]))
        .stdout(predicate::str::contains("Visible"))
        .stdout(predicate::str::contains(&id[..8]).not());
}

#[test]
fn test_search_is_case_insensitive() {
    let dir = setup_tracker();
    json(&dir, &["add", "Login fails", "-d", "SSO redirect loops"]);
    json(&dir, &["add", "Export", "-d", "csv output"]);

    assert_eq!(titles(&json(&dir, &["search", "sso"])), vec!["Login fails"]);
    assert_eq!(json(&dir, &["search", "nothing"]), serde_json::json!([]));
}

#[test]
fn test_status_counts_states() {
    let dir = setup_tracker();
    add(&dir, "One", &[]);
    let two = add(&dir, "Two", &[]);
    json(&dir, &["accept", &two]);

    let status = json(&dir, &["status"]);
    assert_eq!(status["total"], 2);
    assert_eq!(status["states"]["INBOX"], 1);
    assert_eq!(status["states"]["NEW"], 1);
    assert_eq!(status["states"]["DONE"], 0);
}

#[test]
fn test_migrate_reports_current_schema() {
    let dir = setup_tracker();

    tsk_cmd()
        .current_dir(dir.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema is up to date"));
}

#[test]
fn test_configured_author_is_recorded() {
    let dir = setup_tracker();
    std::fs::write(
        dir.path().join(".tsk/config.toml"),
        "author = \"Config Author <ca@example.com>\"\n",
    )
    .unwrap();

    let id = add(&dir, "Authored", &[]);
    let shown = json(&dir, &["show", &id]);
    assert_eq!(shown["task"]["author"], "Config Author <ca@example.com>");
}
