// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! permission-request: the remote approval path.
//!
//! When the relay flags the user away, the permission request is
//! mirrored to the relay as an approval so the mobile UI can grant it.
//! If the relay reports it already allowed (pre-approved tooling), it is
//! handed straight to the daemon for execution; otherwise the poller
//! picks it up after the user approves.

use tp_core::{is_valid_tool_name, SessionId};
use tp_relay::{NewApproval, RelayApi};

use crate::io::HookOutput;

use super::{HookCtx, HookEvent};

const EVENT: HookEvent = HookEvent::PermissionRequest;

pub async fn run(ctx: &HookCtx) -> Result<HookOutput, String> {
    if ctx.input.session_id.is_empty() || !is_valid_tool_name(&ctx.input.tool_name) {
        return Ok(HookOutput::neutral(EVENT.name()));
    }
    let Some(relay) = &ctx.relay else {
        return Ok(HookOutput::neutral(EVENT.name()));
    };
    let session_id = SessionId::new(ctx.input.session_id.clone());

    let session = relay
        .fetch_session(&session_id)
        .await
        .map_err(|e| format!("session fetch failed: {e}"))?;
    let Some(session) = session else {
        return Ok(HookOutput::neutral(EVENT.name()));
    };
    if !session.is_away {
        return Ok(HookOutput::neutral(EVENT.name()));
    }

    let created = relay
        .create_approval(&NewApproval {
            session_id: session_id.clone(),
            tool_name: ctx.input.tool_name.clone(),
            tool_input: ctx.input.tool_input.clone(),
        })
        .await
        .map_err(|e| format!("approval creation failed: {e}"))?;

    if created.is_allowed() {
        ctx.daemon
            .handoff_approval(
                created.approval_id.as_str(),
                session_id.as_str(),
                &ctx.input.tool_name,
                &ctx.input.tool_input,
            )
            .await?;
    }

    Ok(HookOutput::neutral(EVENT.name()))
}
