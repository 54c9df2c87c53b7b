// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook diagnostic log.
//!
//! Hooks must not write to stderr in normal operation, so diagnostics go
//! to a file: `TELEPORTATION_HOOK_LOG` when set, otherwise `hook.log` in
//! the state directory. Logging is best-effort; a failing log must never
//! fail a hook.

use std::path::PathBuf;

use tp_core::{Clock, StatePaths, SystemClock};

/// Resolve the hook log path.
pub fn log_path(paths: Option<&StatePaths>) -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TELEPORTATION_HOOK_LOG") {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    paths.map(|p| p.state_dir.join("hook.log"))
}

/// Append one line to the hook log.
pub fn log(paths: Option<&StatePaths>, event: &str, message: &str) {
    let Some(path) = log_path(paths) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    use std::io::Write;
    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = writeln!(file, "{} [{}] {}", SystemClock.epoch_ms(), event, message);
}

#[cfg(test)]
#[path = "logfile_tests.rs"]
mod tests;
