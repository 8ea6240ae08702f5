use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Runs the binary inside `dir` with an isolated config home.
fn run_pagerender(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pagerender"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config-home"))
        .env_remove("RUST_LOG")
        .output()
        .expect("run pagerender")
}

fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).expect("stdout should be JSON")
}

#[test]
fn missing_node_exits_two_with_launch_error() {
    let dir = TempDir::new().expect("tempdir");

    let output = run_pagerender(
        dir.path(),
        &[
            "https://example.com",
            "--node-command",
            "definitely-not-a-binary",
            "--format",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let json = parse_json(&output.stdout);
    assert_eq!(json.get("mode").and_then(|v| v.as_str()), Some("error"));
    assert_eq!(json["error"]["category"].as_str(), Some("launch"));
    assert!(json["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("definitely-not-a-binary"));
    assert!(
        !dir.path().join("screenshot.png").exists(),
        "no screenshot may be written when launch fails"
    );
}

#[test]
fn failed_launch_leaves_explicit_screenshot_path_absent() {
    let dir = TempDir::new().expect("tempdir");
    let shot = dir.path().join("shots").join("page.png");

    let output = run_pagerender(
        dir.path(),
        &[
            "--node-command",
            "definitely-not-a-binary",
            "--screenshot",
            shot.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(!shot.exists());
}

#[test]
fn error_report_can_be_written_to_file() {
    let dir = TempDir::new().expect("tempdir");
    let report = dir.path().join("report.json");

    let output = run_pagerender(
        dir.path(),
        &[
            "--node-command",
            "definitely-not-a-binary",
            "-o",
            report.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let body = std::fs::read(&report).expect("report written");
    let json = parse_json(&body);
    assert_eq!(json.get("mode").and_then(|v| v.as_str()), Some("error"));
    assert!(json["error"]["remediation"].is_string());
}

#[test]
fn invalid_config_exits_two_with_config_error() {
    let dir = TempDir::new().expect("tempdir");
    let cfg_path = dir.path().join("pagerender.toml");
    std::fs::write(&cfg_path, "max_concurrent_sessions = 0\n").expect("write config");

    let output = run_pagerender(dir.path(), &["--config", cfg_path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let json = parse_json(&output.stdout);
    assert_eq!(json["error"]["category"].as_str(), Some("config"));
    assert!(json["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("Invalid config"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let cfg_path = dir.path().join("pagerender.toml");
    std::fs::write(&cfg_path, "threshold = 0.9\n").expect("write config");

    let output = run_pagerender(dir.path(), &["--config", cfg_path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let json = parse_json(&output.stdout);
    assert_eq!(json["error"]["category"].as_str(), Some("config"));
}

#[test]
fn pretty_error_outside_terminal_stays_json() {
    let dir = TempDir::new().expect("tempdir");

    let output = run_pagerender(
        dir.path(),
        &[
            "--node-command",
            "definitely-not-a-binary",
            "--format",
            "pretty",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let json = parse_json(&output.stdout);
    assert_eq!(json["error"]["category"].as_str(), Some("launch"));
}

#[test]
fn malformed_viewport_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");

    let output = run_pagerender(dir.path(), &["--viewport", "wide"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--viewport"));
}

#[test]
fn zero_timeout_flag_is_a_config_error_before_launch() {
    let dir = TempDir::new().expect("tempdir");

    for flag in ["--process-timeout", "--nav-timeout", "--network-idle-timeout"] {
        let output = run_pagerender(
            dir.path(),
            &[
                "https://example.com",
                "--node-command",
                "definitely-not-a-binary",
                flag,
                "0",
            ],
        );

        assert_eq!(output.status.code(), Some(2), "{flag}");
        let json = parse_json(&output.stdout);
        assert_eq!(json["error"]["category"].as_str(), Some("config"), "{flag}: {json}");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap_or_default()
            .contains(flag));
    }
}
