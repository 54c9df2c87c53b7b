// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};

/// Returns the path to a workspace binary.
///
/// Resolves relative to the test binary itself when CARGO_MANIFEST_DIR
/// points somewhere stale (e.g. a shared target directory).
pub fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where the workspace binaries are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// A `tp-hook <event>` invocation isolated to a fresh state directory.
///
/// The relay stays unconfigured and the daemon port points at the
/// discard port, so every network path fails — which is exactly what
/// the never-block contract is specified against.
pub fn hook_cmd(event: &str, state_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(binary_path("tp-hook"));
    cmd.arg(event)
        .env_clear()
        .env("HOME", state_dir)
        .env("TELEPORTATION_STATE_DIR", state_dir)
        .env("TELEPORTATION_DAEMON_PORT", "1")
        .env("TELEPORTATION_DAEMON_BIN", "/bin/false")
        .env("TELEPORTATION_HOOK_LOG", state_dir.join("hook.log"));
    cmd
}

/// Parse the single JSON object a hook prints on stdout.
pub fn hook_output(output: &[u8]) -> serde_json::Value {
    let raw = String::from_utf8_lossy(output);
    serde_json::from_str(raw.trim()).unwrap_or_else(|e| {
        panic!("hook stdout was not a JSON object: {e}\nstdout: {raw}");
    })
}
