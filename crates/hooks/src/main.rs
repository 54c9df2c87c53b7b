// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tp-hook entry point.
//!
//! Invoked synchronously by the assistant; exits zero on every path so a
//! teleportation fault can never block the user's session.

use clap::{Parser, Subcommand};

use tp_hooks::hooks::{self, HookEvent};
use tp_hooks::io::{HookInput, HookOutput};

#[derive(Parser)]
#[command(name = "tp-hook", version, about = "Teleportation assistant hooks")]
struct Cli {
    #[command(subcommand)]
    event: Event,
}

#[derive(Subcommand)]
enum Event {
    /// Assistant session started
    SessionStart,
    /// About to run a tool (context delivery point)
    PreToolUse,
    /// Permission requested for a tool call (remote approval path)
    PermissionRequest,
    /// A tool finished (timeline recording)
    PostToolUse,
    /// Assistant session ended
    SessionEnd,
}

impl From<Event> for HookEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::SessionStart => HookEvent::SessionStart,
            Event::PreToolUse => HookEvent::PreToolUse,
            Event::PermissionRequest => HookEvent::PermissionRequest,
            Event::PostToolUse => HookEvent::PostToolUse,
            Event::SessionEnd => HookEvent::SessionEnd,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Even argv errors must not block the assistant: emit a neutral
    // response and exit zero.
    let event = match Cli::try_parse() {
        Ok(cli) => HookEvent::from(cli.event),
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                return;
            }
            tp_hooks::logfile::log(None, "argv", &e.to_string());
            println!("{}", HookOutput::neutral("Unknown").to_stdout_json());
            return;
        }
    };

    let input = HookInput::read_stdin();
    let output = hooks::run(event, input).await;
    println!("{}", output.to_stdout_json());
}
