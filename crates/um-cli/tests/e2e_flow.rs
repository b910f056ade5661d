//! End-to-end tests for the complete flow: log events, then query the
//! projections through the real binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn um(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_um"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run um")
}

fn log(config: &Path, args: &[&str]) {
    let output = um(config, &[&["log"], args].concat());
    assert!(
        output.status.success(),
        "um log should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Writes a config pointing at a database inside the temp dir.
fn write_config(temp: &TempDir) -> PathBuf {
    let db_path = temp.path().join("um.db");
    let config_path = temp.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "database_path = {:?}\n\
             timezone = \"UTC\"\n\
             target_packages = [\"com.example.reader\"]\n",
            db_path
        ),
    )
    .unwrap();
    config_path
}

/// Seeds a morning of activity on 2025-02-10 (UTC).
fn seed_day(config: &Path) {
    log(config, &["service-started", "--at", "2025-02-10T08:00:00Z"]);
    log(
        config,
        &[
            "foreground",
            "--package",
            "com.example.reader",
            "--at",
            "2025-02-10T09:00:00Z",
        ],
    );
    log(
        config,
        &["suggestion-shown", "--id", "s1", "--at", "2025-02-10T09:10:00Z"],
    );
    log(
        config,
        &[
            "suggestion-decision",
            "--id",
            "s1",
            "--decision",
            "snoozed",
            "--at",
            "2025-02-10T09:12:00Z",
        ],
    );
    // Brief switch away, back within the two-minute grace period.
    log(config, &["foreground", "--at", "2025-02-10T09:30:00Z"]);
    log(
        config,
        &[
            "foreground",
            "--package",
            "com.example.reader",
            "--at",
            "2025-02-10T09:31:00Z",
        ],
    );
    log(config, &["foreground", "--at", "2025-02-10T10:00:00Z"]);
}

#[test]
fn report_json_reflects_logged_events() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    seed_day(&config);

    let output = um(&config, &["report", "--date", "2025-02-10", "--json"]);
    assert!(
        output.status.success(),
        "report should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["timezone"], "UTC");

    let day = &report["days"][0];
    assert_eq!(day["date"], "2025-02-10");

    // 09:00-09:30 plus 09:31-10:00, coalesced into one session by the grace
    // period.
    let stats = &day["stats"];
    assert_eq!(stats["total_usage_ms"], 3_540_000);
    assert_eq!(stats["session_count"], 1);
    assert_eq!(stats["apps"][0]["package"], "com.example.reader");

    // Service started at 08:00 and never stopped: monitored through the
    // rest of the day.
    assert_eq!(day["monitored_ms"], 57_600_000);

    // The prompt was snoozed and the session ran on well past it.
    let suggestions = &stats["suggestions"];
    assert_eq!(suggestions["shown_count"], 1);
    assert_eq!(suggestions["continued_count"], 1);
    assert_eq!(suggestions["decision_counts"]["snoozed"], 1);
}

#[test]
fn report_human_output_summarizes_the_day() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    seed_day(&config);

    let output = um(&config, &["report", "--date", "2025-02-10"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("USAGE REPORT: Monday, Feb 10, 2025"));
    assert!(stdout.contains("Total usage:   59m"));
    assert!(stdout.contains("com.example.reader"));
    assert!(stdout.contains("SUGGESTIONS"));
}

#[test]
fn multi_day_report_covers_each_date() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    seed_day(&config);

    let output = um(
        &config,
        &["report", "--date", "2025-02-11", "--days", "2", "--json"],
    );
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let days = report["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["date"], "2025-02-10");
    assert_eq!(days[1]["date"], "2025-02-11");
    assert!(days[0]["stats"].is_object());
}

#[test]
fn sessions_and_monitoring_commands_list_the_day() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    seed_day(&config);

    let sessions = um(&config, &["sessions", "--date", "2025-02-10"]);
    assert!(sessions.status.success());
    let stdout = String::from_utf8(sessions.stdout).unwrap();
    assert!(stdout.contains("com.example.reader"));
    assert!(stdout.contains("09:00:00"));

    let monitoring = um(&config, &["monitoring", "--date", "2025-02-10", "--json"]);
    assert!(monitoring.status.success());
    let value: serde_json::Value = serde_json::from_slice(&monitoring.stdout).unwrap();
    assert_eq!(value["total_ms"], 57_600_000);
}

#[test]
fn status_counts_logged_events() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    seed_day(&config);

    let output = um(&config, &["status"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Events: 7"));
    assert!(stdout.contains("Last event: 2025-02-10T10:00:00"));
}

#[test]
fn report_creates_missing_database_directory() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("state").join("um.db");
    let config_path = temp.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("database_path = {:?}\ntimezone = \"UTC\"\n", db_path),
    )
    .unwrap();

    let output = um(&config_path, &["report", "--date", "2025-02-10"]);
    assert!(
        output.status.success(),
        "report should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(db_path.parent().unwrap().is_dir());
}

#[test]
fn empty_log_yields_empty_report() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    let output = um(&config, &["report", "--date", "2025-02-10"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("No usage recorded for this day."));
}
