// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook dispatch.
//!
//! One module per assistant lifecycle point. `run` builds the shared
//! context, emits user warnings, and guarantees the never-block
//! contract: whatever a hook returns or fails with, the caller gets a
//! printable [`HookOutput`] and the process exits zero.

pub mod permission_request;
pub mod post_tool_use;
pub mod pre_tool_use;
pub mod session_end;
pub mod session_start;

use tp_core::{Settings, StatePaths};
use tp_relay::RelayClient;

use crate::daemon::DaemonClient;
use crate::io::{HookInput, HookOutput};
use crate::logfile;
use crate::warnings::Warnings;

/// The assistant lifecycle points with a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    SessionStart,
    PreToolUse,
    PermissionRequest,
    PostToolUse,
    SessionEnd,
}

impl HookEvent {
    /// The `hookEventName` value the assistant expects.
    pub fn name(self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::PreToolUse => "PreToolUse",
            Self::PermissionRequest => "PermissionRequest",
            Self::PostToolUse => "PostToolUse",
            Self::SessionEnd => "SessionEnd",
        }
    }
}

/// Everything a hook body needs.
pub struct HookCtx {
    pub input: HookInput,
    pub paths: StatePaths,
    pub settings: Settings,
    pub daemon: DaemonClient,
    pub relay: Option<RelayClient>,
}

/// Run a hook event to a printable output. Never errors out of here.
pub async fn run(event: HookEvent, input: HookInput) -> HookOutput {
    let paths = match StatePaths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            logfile::log(None, event.name(), &format!("no state dir: {e}"));
            return HookOutput::neutral(event.name());
        }
    };
    let settings = match Settings::load(&paths.state_dir) {
        Ok(settings) => settings,
        Err(e) => {
            logfile::log(Some(&paths), event.name(), &format!("config error: {e}"));
            return HookOutput::neutral(event.name());
        }
    };

    Warnings::detect(&input.session_id, &paths).emit();

    let ctx = HookCtx {
        daemon: DaemonClient::new(settings.daemon.port),
        relay: RelayClient::from_settings(&settings.relay).ok(),
        input,
        paths,
        settings,
    };

    let result = match event {
        HookEvent::SessionStart => session_start::run(&ctx).await,
        HookEvent::PreToolUse => pre_tool_use::run(&ctx).await,
        HookEvent::PermissionRequest => permission_request::run(&ctx).await,
        HookEvent::PostToolUse => post_tool_use::run(&ctx).await,
        HookEvent::SessionEnd => session_end::run(&ctx).await,
    };

    match result {
        Ok(output) => output,
        Err(message) => {
            logfile::log(Some(&ctx.paths), event.name(), &message);
            HookOutput::neutral(event.name())
        }
    }
}
