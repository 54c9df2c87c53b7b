// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for starting, stopping, and monitoring the tpd process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tp_daemon::lock::{process_alive, read_pid_file};

/// How long `stop` waits after each signal before escalating.
const EXIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Start the daemon in the background, detached from the terminal.
pub fn start_daemon_background() -> Result<(), String> {
    let binary = find_tpd_binary();
    std::process::Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| format!("failed to start {}: {e}", binary.display()))
}

/// Stop the daemon: SIGTERM, bounded wait, then SIGKILL. Returns the PID
/// that was stopped, if a daemon was running.
pub fn stop_daemon(paths: &tp_core::StatePaths) -> Option<u32> {
    let pid_path = paths.pid_file();
    let pid = read_pid_file(&pid_path)?;
    if !process_alive(pid) {
        // Stale file: nothing to stop, clean it up.
        let _ = std::fs::remove_file(&pid_path);
        return None;
    }

    kill_signal("-15", pid);
    if wait_for_exit(pid, EXIT_TIMEOUT) {
        return Some(pid);
    }

    kill_signal("-9", pid);
    wait_for_exit(pid, EXIT_TIMEOUT);
    // A SIGKILLed daemon never removed its own PID file.
    let _ = std::fs::remove_file(&pid_path);
    Some(pid)
}

fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !process_alive(pid)
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Locate the daemon binary: explicit override, then a sibling of the
/// current executable, then PATH.
pub fn find_tpd_binary() -> PathBuf {
    if let Ok(path) = std::env::var("TELEPORTATION_DAEMON_BIN") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tpd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("tpd")
}

/// Startup marker prefix the daemon writes before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- tpd: starting (pid: ";

/// Read the daemon log from the last startup marker, looking for errors.
pub fn read_startup_error(paths: &tp_core::StatePaths) -> Option<String> {
    let content = std::fs::read_to_string(paths.log_file()).ok()?;
    parse_startup_error(&content)
}

/// Parse startup errors from log content (pure logic, no I/O).
fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
