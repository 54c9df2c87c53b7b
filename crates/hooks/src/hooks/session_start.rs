// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! session-start: make sure the daemon exists, register the session, and
//! drop the session marker used later to detect credential updates.

use tp_core::{write_private, Clock, SystemClock};

use crate::io::HookOutput;

use super::{HookCtx, HookEvent};

const EVENT: HookEvent = HookEvent::SessionStart;

pub async fn run(ctx: &HookCtx) -> Result<HookOutput, String> {
    if ctx.input.session_id.is_empty() {
        return Err("missing session_id on stdin".to_string());
    }

    if !ctx.daemon.ensure_running().await {
        return Err("daemon did not start within the retry budget".to_string());
    }

    ctx.daemon
        .register_session(&ctx.input.session_id, &ctx.input.session_id, &ctx.input.cwd)
        .await?;

    // Marker baseline for the credentials-changed warning.
    write_private(
        &ctx.paths.session_marker(),
        &format!("{}\n{}\n", SystemClock.epoch_ms(), ctx.input.session_id),
    )
    .map_err(|e| format!("failed to write session marker: {e}"))?;

    Ok(HookOutput::neutral(EVENT.name()))
}
