use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "tasktrack-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn store(&self) -> PathBuf {
        self.path.join("items.jsonl")
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Run against an explicit store, from inside the temp dir so no stray
/// `.tasktrack/config.toml` is picked up.
fn run_tasktrack<I, S>(tmp: &TempDirGuard, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_tasktrack");
    Command::new(bin)
        .current_dir(tmp.path())
        .env_remove("TASKTRACK_LOG")
        .arg("--store")
        .arg(tmp.store())
        .args(args)
        .output()
        .expect("tasktrack command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_exit_code(output: &Output, code: i32) {
    if output.status.code() != Some(code) {
        panic!(
            "expected exit code {code}, got {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn add_json(tmp: &TempDirGuard, args: &[&str]) -> u64 {
    let mut full = vec!["add"];
    full.extend_from_slice(args);
    full.push("--json");
    let output = run_tasktrack(tmp, &full);
    assert_success(&output);
    parse_json_stdout(&output)["item"]["id"]
        .as_u64()
        .expect("created id")
}

#[test]
fn add_then_list_json() {
    let tmp = TempDirGuard::new("add-list");
    let id = add_json(&tmp, &["task", "--name", "Write report", "--description", "q3"]);
    assert_eq!(id, 1);
    assert!(tmp.store().exists());

    let output = run_tasktrack(&tmp, ["list", "task", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "task.list");
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["items"][0]["name"], "Write report");
    assert_eq!(payload["items"][0]["status"], "NEW");
}

#[test]
fn epic_status_follows_subtasks() {
    let tmp = TempDirGuard::new("epic-status");
    let epic = add_json(&tmp, &["epic", "--name", "Release"]);
    let epic_arg = epic.to_string();
    let s1 = add_json(&tmp, &["subtask", "--name", "Build", "--epic", &epic_arg]);
    add_json(&tmp, &["subtask", "--name", "Ship", "--epic", &epic_arg]);

    let output = run_tasktrack(&tmp, ["update", &s1.to_string(), "--status", "DONE"]);
    assert_success(&output);

    let output = run_tasktrack(&tmp, ["get", "epic", &epic_arg, "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["item"]["status"], "IN_PROGRESS");
    assert_eq!(payload["item"]["subtaskIds"].as_array().map(Vec::len), Some(2));

    let output = run_tasktrack(&tmp, ["subtasks", &epic_arg, "--json"]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["count"], 2);
}

#[test]
fn conflicting_schedule_exits_with_conflict_code() {
    let tmp = TempDirGuard::new("conflict");
    let a = add_json(&tmp, &["task", "--name", "A"]).to_string();
    let b = add_json(&tmp, &["task", "--name", "B"]).to_string();

    let output = run_tasktrack(
        &tmp,
        ["schedule", &a, "--start", "2025-09-15T09:00", "--minutes", "120"],
    );
    assert_success(&output);

    let output = run_tasktrack(
        &tmp,
        ["schedule", &b, "--start", "2025-09-15T10:00", "--minutes", "60"],
    );
    assert_exit_code(&output, 4);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));

    let output = run_tasktrack(&tmp, ["prioritized", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["items"][0]["name"], "A");

    let output = run_tasktrack(
        &tmp,
        ["overlaps", "--start", "2025-09-15T11:00", "--minutes", "30", "--json"],
    );
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["overlapping"], true);
}

#[test]
fn error_kinds_map_to_exit_codes() {
    let tmp = TempDirGuard::new("exit-codes");
    add_json(&tmp, &["task", "--name", "A"]);

    let output = run_tasktrack(&tmp, ["get", "task", "42"]);
    assert_exit_code(&output, 2);

    let output = run_tasktrack(&tmp, ["add", "subtask", "--name", "orphan"]);
    assert_exit_code(&output, 3);

    let output = run_tasktrack(&tmp, ["schedule", "1", "--start", "not-a-time", "--minutes", "5"]);
    assert_exit_code(&output, 3);

    let output = run_tasktrack(&tmp, ["add", "subtask", "--name", "x", "--epic", "1"]);
    assert_exit_code(&output, 2);
}

#[test]
fn history_persists_across_invocations() {
    let tmp = TempDirGuard::new("history");
    let a = add_json(&tmp, &["task", "--name", "A"]).to_string();
    let b = add_json(&tmp, &["task", "--name", "B"]).to_string();

    for id in [&a, &b, &a] {
        assert_success(&run_tasktrack(&tmp, ["get", "task", id.as_str()]));
    }

    let output = run_tasktrack(&tmp, ["history", "--json"]);
    assert_success(&output);
    let names: Vec<String> = parse_json_stdout(&output)["items"]
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|item| item["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["B", "A"]);

    let output = run_tasktrack(&tmp, ["delete", "task", &a]);
    assert_success(&output);
    let output = run_tasktrack(&tmp, ["history"]);
    assert_success(&output);
    let text = stdout_text(&output);
    assert!(text.contains("Count: 1"), "unexpected history output:\n{text}");
}

#[test]
fn clear_epics_removes_subtasks() {
    let tmp = TempDirGuard::new("clear");
    let epic = add_json(&tmp, &["epic", "--name", "E"]).to_string();
    add_json(&tmp, &["subtask", "--name", "S", "--epic", &epic]);

    let output = run_tasktrack(&tmp, ["clear", "epic", "--json"]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["removed"], 2);

    let output = run_tasktrack(&tmp, ["list", "subtask", "--json"]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["count"], 0);
}

#[test]
fn config_file_sets_time_format() {
    let tmp = TempDirGuard::new("config");
    let config = tmp.path().join("tasktrack.toml");
    fs::write(&config, "time_format = \"%d.%m.%Y %H:%M\"\n").expect("config written");
    let id = add_json(&tmp, &["task", "--name", "A"]).to_string();

    let config_arg = config.display().to_string();
    let output = run_tasktrack(
        &tmp,
        [
            "--config",
            config_arg.as_str(),
            "schedule",
            id.as_str(),
            "--start",
            "15.09.2025 09:30",
            "--minutes",
            "30",
            "--json",
        ],
    );
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["item"]["startTime"], "2025-09-15T09:30:00");
    assert_eq!(payload["item"]["endTime"], "2025-09-15T10:00:00");
}
