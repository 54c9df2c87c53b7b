// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The never-block contract: hooks exit zero and print one JSON object
//! on every path, including total network failure.

use crate::prelude::*;
use tempfile::tempdir;

const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

#[test]
fn pre_tool_use_is_neutral_without_daemon_or_relay() {
    let dir = tempdir().unwrap();
    let output = hook_cmd("pre-tool-use", dir.path())
        .write_stdin(format!(
            r#"{{"session_id":"{UUID}","tool_name":"Bash","tool_input":{{"command":"ls"}},"cwd":"/tmp"}}"#
        ))
        .output()
        .unwrap();

    assert!(output.status.success(), "hooks must exit zero");
    let json = hook_output(&output.stdout);
    assert_eq!(json["suppressOutput"], true);
    assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PreToolUse");
    assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "neutral");
}

#[test]
fn post_tool_use_swallows_relay_absence() {
    let dir = tempdir().unwrap();
    let output = hook_cmd("post-tool-use", dir.path())
        .write_stdin(format!(r#"{{"session_id":"{UUID}","tool_name":"Bash"}}"#))
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = hook_output(&output.stdout);
    assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PostToolUse");
}

#[test]
fn session_start_exits_zero_when_daemon_cannot_start() {
    let dir = tempdir().unwrap();
    // TELEPORTATION_DAEMON_BIN is /bin/false: the spawn "succeeds" but no
    // daemon ever answers; the retry budget must expire quietly.
    let output = hook_cmd("session-start", dir.path())
        .write_stdin(format!(r#"{{"session_id":"{UUID}","cwd":"/tmp"}}"#))
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = hook_output(&output.stdout);
    assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "neutral");
    // The failure went to the hook log, not stderr.
    let log = std::fs::read_to_string(dir.path().join("hook.log")).unwrap_or_default();
    assert!(log.contains("SessionStart"), "log was: {log}");
}

#[test]
fn garbage_stdin_still_produces_valid_output() {
    let dir = tempdir().unwrap();
    let output = hook_cmd("pre-tool-use", dir.path())
        .write_stdin("this is { not json")
        .output()
        .unwrap();

    assert!(output.status.success());
    hook_output(&output.stdout);
}

#[test]
fn malformed_session_id_warns_on_stderr_but_exits_zero() {
    let dir = tempdir().unwrap();
    let output = hook_cmd("post-tool-use", dir.path())
        .write_stdin(r#"{"session_id":"definitely-not-a-uuid"}"#)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not look like a UUID"), "stderr: {stderr}");
}

#[test]
fn unknown_subcommand_exits_zero_with_neutral_output() {
    let dir = tempdir().unwrap();
    let output = hook_cmd("no-such-event", dir.path())
        .write_stdin("{}")
        .output()
        .unwrap();

    assert!(output.status.success(), "argv errors must not block the assistant");
    hook_output(&output.stdout);
}
