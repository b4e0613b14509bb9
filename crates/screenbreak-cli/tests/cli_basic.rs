//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use screenbreak_core::{AlarmScheduler, AlarmSpec, Database, BREAK_REMINDER_ALARM};
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_screenbreak"))
        .args(args)
        .env("SCREENBREAK_DATA_DIR", dir.path())
        .env_remove("SCREENBREAK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

/// Start a long-running command with piped stdout, forwarding its lines.
fn spawn_cli(dir: &TempDir, args: &[&str]) -> (Child, mpsc::Receiver<String>) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_screenbreak"))
        .args(args)
        .env("SCREENBREAK_DATA_DIR", dir.path())
        .env_remove("SCREENBREAK_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn CLI command");

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    (child, rx)
}

fn next_line(rx: &mpsc::Receiver<String>) -> String {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("no output from CLI command")
}

/// Next daemon line that is a response rather than an event.
fn next_response(rx: &mpsc::Receiver<String>) -> serde_json::Value {
    loop {
        let value: serde_json::Value = serde_json::from_str(&next_line(rx)).unwrap();
        if value.get("type").is_none() {
            return value;
        }
    }
}

#[test]
fn test_fresh_install_stats() {
    let dir = tempfile::tempdir().unwrap();
    let stats = run_json(&dir, &["stats"]);
    assert_eq!(stats["isEnabled"], true);
    assert_eq!(stats["breakCount"], 0);
    assert_eq!(stats["isBreakActive"], false);
    let total = stats["nextBreakIn"]["totalSeconds"].as_u64().unwrap();
    assert!((1190..=1200).contains(&total), "unexpected countdown {total}");
    assert!(stats.get("error").is_none());
    assert!(dir.path().join("screenbreak.db").exists());
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_start_break_counts() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_json(&dir, &["start-break"])["breakCount"], 1);
    let second = run_json(&dir, &["start-break"]);
    assert_eq!(second["success"], true);
    assert_eq!(second["breakCount"], 2);
    assert_eq!(run_json(&dir, &["stats"])["breakCount"], 2);
}

#[test]
fn test_disable_and_enable() {
    let dir = tempfile::tempdir().unwrap();
    let off = run_json(&dir, &["disable"]);
    assert_eq!(off["success"], true);
    assert_eq!(off["isEnabled"], false);
    assert_eq!(off["nextBreakIn"]["minutes"], 20);
    assert_eq!(run_json(&dir, &["stats"])["isEnabled"], false);

    let on = run_json(&dir, &["enable"]);
    assert_eq!(on["isEnabled"], true);
    assert_eq!(run_json(&dir, &["stats"])["isEnabled"], true);
}

#[test]
fn test_snooze() {
    let dir = tempfile::tempdir().unwrap();
    let snoozed = run_json(&dir, &["snooze"]);
    assert_eq!(snoozed, serde_json::json!({"success": true}));
}

#[test]
fn test_popup_text() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["popup"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Reminders:    on"));
    assert!(stdout.contains("Screen time:  0:00"));
    assert!(stdout.contains("K\n"));
}

#[test]
fn test_popup_json() {
    let dir = tempfile::tempdir().unwrap();
    let stats = run_json(&dir, &["popup", "--json"]);
    assert!(stats["colorTemp"].as_u64().is_some());
}

#[test]
fn test_poll_without_due_alarms() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_json(&dir, &["poll"])["fired"], 0);
}

#[test]
fn test_poll_shows_a_due_break() {
    let dir = tempfile::tempdir().unwrap();
    run_json(&dir, &["stats"]);
    {
        let db = Database::open_at(dir.path().join("screenbreak.db")).unwrap();
        db.create(BREAK_REMINDER_ALARM, AlarmSpec::once_in_ms(0), 0)
            .unwrap();
    }

    let (code, stdout, stderr) = run_cli(&dir, &["poll"]);
    assert_eq!(code, 0, "poll failed: {stderr}");
    let polled: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(polled["fired"].as_u64().unwrap() >= 1);
    assert_eq!(polled["isBreakActive"], true);
    let events = polled["events"].as_array().unwrap();
    assert!(events.iter().any(|e| e["type"] == "ReminderShown"));
    assert!(stderr.contains("Time for a break"));

    assert_eq!(run_json(&dir, &["stats"])["isBreakActive"], true);
}

#[test]
fn test_daemon_answers_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (mut child, rx) = spawn_cli(&dir, &["daemon"]);
    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, r#"{{"action":"getStats"}}"#).unwrap();
        writeln!(stdin, r#"{{"action":"dance"}}"#).unwrap();
        stdin.flush().unwrap();
    }

    let stats = next_response(&rx);
    assert_eq!(stats["isEnabled"], true);
    assert_eq!(stats["breakCount"], 0);

    let unknown = next_response(&rx);
    assert_eq!(unknown["success"], false);
    assert!(unknown["error"].as_str().unwrap().contains("dance"));

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn test_popup_watch_redraws() {
    let dir = tempfile::tempdir().unwrap();
    let (mut child, rx) = spawn_cli(&dir, &["popup", "--watch"]);

    let first = next_line(&rx);
    assert!(first.starts_with("\x1b[2J\x1b[H"), "unexpected frame {first:?}");
    assert!(first.contains("Reminders:    on"));
    let mut redraws = 0;
    while redraws < 2 {
        if next_line(&rx).starts_with("\x1b[2J") {
            redraws += 1;
        }
    }

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn test_zero_period_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[runtime]\npoll_interval_ms = 0\n",
    )
    .unwrap();
    let (code, _, stderr) = run_cli(&dir, &["stats"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("runtime.poll_interval_ms"), "{stderr}");

    let (code, _, _) = run_cli(&dir, &["daemon"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["config", "get", "breaks.interval_min"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "20");

    let (code, stdout, _) = run_cli(&dir, &["config", "set", "breaks.interval_min", "30"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let stats = run_json(&dir, &["stats"]);
    let minutes = stats["nextBreakIn"]["minutes"].as_u64().unwrap();
    assert!(minutes == 29 || minutes == 30, "unexpected minutes {minutes}");
}

#[test]
fn test_config_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["config", "set", "breaks.interval_min", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));

    let (code, _, _) = run_cli(&dir, &["config", "get", "breaks.nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(&dir, &["config", "set", "breaks.snooze_min", "10"]);
    let (code, _, _) = run_cli(&dir, &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&dir, &["config", "get", "breaks.snooze_min"]);
    assert_eq!(stdout.trim(), "5");
}
