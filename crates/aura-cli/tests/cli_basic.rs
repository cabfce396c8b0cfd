//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data
//! directory, so state never leaks between tests or into the real home.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

struct Output {
    code: i32,
    stdout: String,
    stderr: String,
}

fn run_cli(home: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_aura"))
        .args(args)
        .env("AURA_HOME", home)
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    Output {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

fn run_ok(home: &Path, args: &[&str]) -> Output {
    let out = run_cli(home, args);
    assert_eq!(out.code, 0, "{args:?} failed: {}", out.stderr);
    out
}

fn json(home: &Path, args: &[&str]) -> Value {
    let out = run_ok(home, args);
    serde_json::from_str(&out.stdout).expect("stdout is not JSON")
}

#[test]
fn test_task_add_and_list() {
    let home = tempfile::tempdir().unwrap();
    let added = run_ok(
        home.path(),
        &["task", "add", "Write report", "--category", "work", "--start", "9:30"],
    );
    let id = added.stdout.trim().to_string();
    assert!(!id.is_empty());

    let tasks = json(home.path(), &["task", "list", "--json"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["title"], "Write report");
    assert_eq!(tasks[0]["start_time"], "09:30");
}

#[test]
fn test_task_toggle_awards_xp() {
    let home = tempfile::tempdir().unwrap();
    let id = run_ok(home.path(), &["task", "add", "Stretch"]).stdout.trim().to_string();

    run_ok(home.path(), &["task", "toggle", &id]);
    let stats = json(home.path(), &["stats", "show", "--json"]);
    assert_eq!(stats["xp"], 25);
    assert_eq!(stats["today_completed"], 1);

    run_ok(home.path(), &["task", "toggle", &id]);
    let stats = json(home.path(), &["stats", "show", "--json"]);
    assert_eq!(stats["xp"], 0);
    assert_eq!(stats["today_completed"], 0);
}

#[test]
fn test_unknown_task_fails() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli(home.path(), &["task", "toggle", "missing"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("error: task not found: missing"));
}

#[test]
fn test_task_delete() {
    let home = tempfile::tempdir().unwrap();
    let id = run_ok(home.path(), &["task", "add", "Temp"]).stdout.trim().to_string();
    run_ok(home.path(), &["task", "delete", &id]);
    let tasks = json(home.path(), &["task", "list", "--json", "--all"]);
    assert!(tasks.as_array().unwrap().is_empty());
}

#[test]
fn test_routine_creates_todays_instance() {
    let home = tempfile::tempdir().unwrap();
    let id = run_ok(
        home.path(),
        &["routine", "add", "Morning Walk", "--start", "08:00", "--duration", "20"],
    )
    .stdout
    .trim()
    .to_string();

    let tasks = json(home.path(), &["task", "list", "--json"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0]["id"].as_str().unwrap().starts_with(&format!("routine-{id}-")));

    run_ok(home.path(), &["routine", "toggle", &id]);
    let tasks = json(home.path(), &["task", "list", "--json"]);
    assert!(tasks.as_array().unwrap().is_empty());

    let routines = json(home.path(), &["routine", "list", "--json"]);
    assert_eq!(routines[0]["active"], false);
}

#[test]
fn test_chrono_lifecycle() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["chrono", "start", "focus"]);

    let status = json(home.path(), &["chrono", "status", "--json"]);
    assert_eq!(status["phase"], "running");
    assert_eq!(status["interval"], "focus");
    assert_eq!(status["length_min"], 25);

    let again = run_cli(home.path(), &["chrono", "start", "break"]);
    assert_eq!(again.code, 1);

    run_ok(home.path(), &["chrono", "pause"]);
    let status = json(home.path(), &["chrono", "status", "--json"]);
    assert_eq!(status["phase"], "paused");

    run_ok(home.path(), &["chrono", "cancel"]);
    let status = json(home.path(), &["chrono", "status", "--json"]);
    assert_eq!(status["phase"], "idle");
}

#[test]
fn test_chrono_watch_stops_when_paused() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["chrono", "start", "focus"]);
    run_ok(home.path(), &["chrono", "pause"]);

    let out = run_ok(home.path(), &["chrono", "watch"]);
    assert!(out.stderr.contains("focus paused"));

    run_ok(home.path(), &["chrono", "cancel"]);
    let out = run_ok(home.path(), &["chrono", "watch"]);
    assert!(out.stderr.contains("idle"));
}

#[test]
fn test_chrono_rituals() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["chrono", "rituals", "--focus", "50"]);
    run_ok(home.path(), &["chrono", "start"]);
    let status = json(home.path(), &["chrono", "status", "--json"]);
    assert_eq!(status["length_min"], 50);
}

#[test]
fn test_chat_archive() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["chat", "say", "plan my morning", "--local"]);
    run_ok(home.path(), &["chat", "say", "done", "--local", "--role", "model"]);
    run_ok(home.path(), &["chat", "archive"]);

    let live = json(home.path(), &["chat", "list", "--json"]);
    assert!(live.as_array().unwrap().is_empty());

    let sessions = json(home.path(), &["chat", "sessions", "--json"]);
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["preview"], "plan my morning");

    let id = sessions[0]["id"].as_str().unwrap().to_string();
    run_ok(home.path(), &["chat", "restore", &id]);
    let live = json(home.path(), &["chat", "list", "--json"]);
    assert_eq!(live.as_array().unwrap().len(), 2);

    run_ok(home.path(), &["chat", "clear"]);
    let empty = run_ok(home.path(), &["chat", "archive"]);
    assert!(empty.stderr.contains("Nothing to archive"));
}

#[test]
fn test_plan_without_key_fails() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["task", "add", "Keep me"]);
    let out = run_cli(home.path(), &["plan", "run", "gym at 6, then email"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("Neural key missing"));

    let tasks = json(home.path(), &["task", "list", "--json"]);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[test]
fn test_chat_without_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli(home.path(), &["chat", "say", "how do I start?"]);
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("Neural key missing"));

    let live = json(home.path(), &["chat", "list", "--json"]);
    assert!(live.as_array().unwrap().is_empty());
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["config", "get", "undo.window_secs"]);
    assert_eq!(out.stdout.trim(), "5");

    run_ok(home.path(), &["config", "set", "reconcile.policy", "all-non-routine"]);
    let out = run_ok(home.path(), &["config", "get", "reconcile.policy"]);
    assert_eq!(out.stdout.trim(), "all-non-routine");

    let bad = run_cli(home.path(), &["config", "set", "nope.key", "1"]);
    assert_eq!(bad.code, 1);

    let list = run_ok(home.path(), &["config", "list"]);
    assert!(list.stdout.contains("storage.slot = aura_state"));
}

#[test]
fn test_completions() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["completions", "bash"]);
    assert!(out.stdout.contains("aura"));
}
