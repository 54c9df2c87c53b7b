// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! session-end: stop per-session helpers, mark the session stopped at
//! the relay, and deregister from the daemon.

use std::process::Stdio;

use tp_core::{SessionId, StatePaths};
use tp_relay::{DaemonStatePatch, RelayApi};

use crate::io::HookOutput;

use super::{HookCtx, HookEvent};

const EVENT: HookEvent = HookEvent::SessionEnd;

pub async fn run(ctx: &HookCtx) -> Result<HookOutput, String> {
    if ctx.input.session_id.is_empty() {
        return Ok(HookOutput::neutral(EVENT.name()));
    }

    terminate_helper(&ctx.paths, &ctx.input.session_id);

    let session_id = SessionId::new(ctx.input.session_id.clone());
    if let Some(relay) = &ctx.relay {
        let _ = relay
            .update_daemon_state(&session_id, &DaemonStatePatch::stopped("session ended"))
            .await;
    }

    // Bounded by the daemon client's 2-second budget so a wedged daemon
    // cannot hang session teardown.
    let _ = ctx.daemon.deregister_session(&ctx.input.session_id).await;

    Ok(HookOutput::neutral(EVENT.name()))
}

/// Kill the per-session helper recorded in the heartbeat PID file.
///
/// The file's second line records the owning session id; a mismatch
/// means the file belongs to another session's helper and is left alone.
/// Returns the PID that was signalled, if any.
pub fn terminate_helper(paths: &StatePaths, session_id: &str) -> Option<u32> {
    let path = paths.heartbeat_pid_file(session_id);
    let content = std::fs::read_to_string(&path).ok()?;
    let mut lines = content.lines();
    let pid: Option<u32> = lines.next().and_then(|l| l.trim().parse().ok());
    let stored_session = lines.next().unwrap_or("").trim();

    if stored_session != session_id {
        return None;
    }

    if let Some(pid) = pid {
        polite_kill(pid);
    }
    let _ = std::fs::remove_file(&path);
    pid
}

fn polite_kill(pid: u32) {
    let _ = std::process::Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Write a helper PID file in the format `terminate_helper` expects.
pub fn write_helper_pid_file(
    paths: &StatePaths,
    session_id: &str,
    pid: u32,
) -> std::io::Result<()> {
    tp_core::write_private(
        &paths.heartbeat_pid_file(session_id),
        &format!("{pid}\n{session_id}\n"),
    )
}

#[cfg(test)]
#[path = "session_end_tests.rs"]
mod tests;
