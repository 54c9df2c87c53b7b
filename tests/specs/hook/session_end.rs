// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! session-end helper cleanup, end to end through the binary.

use crate::prelude::*;
use tempfile::tempdir;

const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

#[test]
fn session_end_removes_matching_helper_pid_file() {
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join(format!("heartbeat-{UUID}.pid"));
    // A PID that cannot be a live process; the TERM fails silently.
    std::fs::write(&pid_file, format!("{}\n{UUID}\n", u32::MAX - 2)).unwrap();

    let output = hook_cmd("session-end", dir.path())
        .write_stdin(format!(r#"{{"session_id":"{UUID}"}}"#))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!pid_file.exists(), "matching helper pid file must be removed");
}

#[test]
fn session_end_leaves_foreign_helper_pid_file() {
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join(format!("heartbeat-{UUID}.pid"));
    std::fs::write(&pid_file, format!("{}\nsome-other-session\n", u32::MAX - 2)).unwrap();

    let output = hook_cmd("session-end", dir.path())
        .write_stdin(format!(r#"{{"session_id":"{UUID}"}}"#))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(pid_file.exists(), "a mismatched helper file must survive");
}
