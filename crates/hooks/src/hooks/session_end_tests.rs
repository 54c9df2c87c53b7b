// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

// A PID that cannot belong to a live process; kill -15 fails silently.
const DEAD_PID: u32 = u32::MAX - 2;

#[test]
fn matching_session_kills_and_removes_file() {
    let dir = tempdir().unwrap();
    let paths = StatePaths::new(dir.path().to_path_buf());
    write_helper_pid_file(&paths, "s1", DEAD_PID).unwrap();

    let pid = terminate_helper(&paths, "s1");

    assert_eq!(pid, Some(DEAD_PID));
    assert!(!paths.heartbeat_pid_file("s1").exists());
}

#[test]
fn mismatched_session_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let paths = StatePaths::new(dir.path().to_path_buf());
    // File named for s1 but recorded for another session (stale rename).
    tp_core::write_private(
        &paths.heartbeat_pid_file("s1"),
        &format!("{DEAD_PID}\nother-session\n"),
    )
    .unwrap();

    let pid = terminate_helper(&paths, "s1");

    assert_eq!(pid, None);
    assert!(paths.heartbeat_pid_file("s1").exists());
}

#[test]
fn missing_file_is_a_noop() {
    let dir = tempdir().unwrap();
    let paths = StatePaths::new(dir.path().to_path_buf());
    assert_eq!(terminate_helper(&paths, "s1"), None);
}

#[test]
fn garbage_pid_still_cleans_up_on_session_match() {
    let dir = tempdir().unwrap();
    let paths = StatePaths::new(dir.path().to_path_buf());
    tp_core::write_private(&paths.heartbeat_pid_file("s1"), "not-a-pid\ns1\n").unwrap();

    assert_eq!(terminate_helper(&paths, "s1"), None);
    assert!(!paths.heartbeat_pid_file("s1").exists());
}
