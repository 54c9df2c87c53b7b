// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pre-tool-use: lazy registration plus context delivery.
//!
//! When the relay holds undelivered results for this session, the hook
//! denies the pending tool call with a formatted block as the reason.
//! The denial is the delivery vehicle: the assistant surfaces the reason
//! text into the conversation before proceeding, which is exactly how
//! work done while the user was away re-enters the live session.

use tp_core::SessionId;
use tp_relay::{DaemonStatePatch, PendingResult, RelayApi};

use crate::io::HookOutput;

use super::{HookCtx, HookEvent};

const EVENT: HookEvent = HookEvent::PreToolUse;

pub async fn run(ctx: &HookCtx) -> Result<HookOutput, String> {
    if ctx.input.session_id.is_empty() {
        return Ok(HookOutput::neutral(EVENT.name()));
    }

    // Lazy registration with the daemon; best-effort.
    let _ = ctx
        .daemon
        .register_session(&ctx.input.session_id, &ctx.input.session_id, &ctx.input.cwd)
        .await;

    let Some(relay) = &ctx.relay else {
        return Ok(HookOutput::neutral(EVENT.name()));
    };
    let session_id = SessionId::new(ctx.input.session_id.clone());

    // Lazy relay-side registration: mark the daemon-state row running.
    let _ = relay
        .update_daemon_state(&session_id, &DaemonStatePatch::status("running"))
        .await;

    let results = relay
        .pending_results(&session_id)
        .await
        .map_err(|e| format!("pending results fetch failed: {e}"))?;
    if results.is_empty() {
        return Ok(HookOutput::neutral(EVENT.name()));
    }

    // Mark delivered first; a result that fails to mark stays pending
    // and would be delivered (duplicated) next time, which beats losing it.
    for result in &results {
        let _ = relay.mark_result_delivered(&session_id, &result.id).await;
    }

    Ok(HookOutput::deny(EVENT.name(), format_results(&results)))
}

/// Render pending results as the human-readable delivery block.
pub fn format_results(results: &[PendingResult]) -> String {
    let mut block = String::from("Remote work completed while the user was away:\n");
    for (index, result) in results.iter().enumerate() {
        let what = result
            .payload
            .command
            .as_deref()
            .unwrap_or("(delegated task)");
        let exit = result
            .payload
            .exit_code
            .map(|c| format!(", exit {c}"))
            .unwrap_or_default();
        block.push_str(&format!(
            "\n[{}] $ {} — {}{}\n",
            index + 1,
            what,
            result.payload.status,
            exit
        ));
        if !result.payload.stdout.is_empty() {
            block.push_str(result.payload.stdout.trim_end());
            block.push('\n');
        }
        if !result.payload.stderr.is_empty() {
            block.push_str("stderr: ");
            block.push_str(result.payload.stderr.trim_end());
            block.push('\n');
        }
    }
    block.push_str("\nSurface these results to the user before continuing.");
    block
}

#[cfg(test)]
#[path = "pre_tool_use_tests.rs"]
mod tests;
