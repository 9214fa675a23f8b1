// Ctrl-C must end a command even when no wait is running
#![cfg(unix)]

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

mod common;
use common::{HANG_KEY, MockApi, command};

/// Start `list-steps` and return once its first API request is in flight
fn start_stuck_command(mock: &MockApi, dir: &TempDir) -> Child {
    let child = command(
        &["list-steps", "--workflow", "p_wf123"],
        dir.path(),
        &[
            ("PIPEPROBE_API_BASE", mock.base_url.as_str()),
            ("PIPEDREAM_API_KEY", HANG_KEY),
        ],
    )
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .spawn()
    .unwrap();

    let started = Instant::now();
    while mock.hung_requests() == 0 {
        assert!(
            started.elapsed() < Duration::from_secs(20),
            "request never reached the mock"
        );
        sleep(Duration::from_millis(50));
    }
    child
}

fn send_sigint(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

fn exit_json(child: Child) -> (Value, Option<i32>) {
    let output = child.wait_with_output().unwrap();
    let json = serde_json::from_slice(&output.stdout).unwrap_or(Value::Null);
    (json, output.status.code())
}

#[test]
fn test_ctrl_c_during_request_exits_130() {
    let mock = MockApi::start();
    let dir = TempDir::new().unwrap();
    let child = start_stuck_command(&mock, &dir);

    send_sigint(&child);
    let sent = Instant::now();
    let (json, code) = exit_json(child);

    assert_eq!(code, Some(130));
    assert_eq!(json["exit_code"], 130);
    // Well under the HTTP client's own 30s timeout
    assert!(sent.elapsed() < Duration::from_secs(20));
}

#[test]
fn test_second_ctrl_c_skips_grace_period() {
    let mock = MockApi::start();
    let dir = TempDir::new().unwrap();
    let child = start_stuck_command(&mock, &dir);

    send_sigint(&child);
    sleep(Duration::from_millis(300));
    send_sigint(&child);
    let sent = Instant::now();
    let (_, code) = exit_json(child);

    assert_eq!(code, Some(130));
    assert!(sent.elapsed() < Duration::from_secs(4));
}
