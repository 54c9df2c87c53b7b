// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! post-tool-use: record the tool invocation in the session timeline.

use serde_json::json;
use tp_core::SessionId;
use tp_relay::RelayApi;

use crate::io::HookOutput;

use super::{HookCtx, HookEvent};

const EVENT: HookEvent = HookEvent::PostToolUse;

pub async fn run(ctx: &HookCtx) -> Result<HookOutput, String> {
    if ctx.input.session_id.is_empty() {
        return Ok(HookOutput::neutral(EVENT.name()));
    }
    let Some(relay) = &ctx.relay else {
        return Ok(HookOutput::neutral(EVENT.name()));
    };

    relay
        .log_timeline_event(
            &SessionId::new(ctx.input.session_id.clone()),
            "tool_use",
            json!({
                "tool_name": ctx.input.tool_name,
                "cwd": ctx.input.cwd,
            }),
        )
        .await
        .map_err(|e| format!("timeline log failed: {e}"))?;

    Ok(HookOutput::neutral(EVENT.name()))
}
