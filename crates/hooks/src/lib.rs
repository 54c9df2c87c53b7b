// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tp-hooks: the event-hook dispatcher.
//!
//! `tp-hook` is a family of short-lived programs the assistant invokes
//! synchronously at lifecycle points. Each reads a JSON object on stdin,
//! performs bounded network I/O against the local daemon and the relay,
//! and writes one JSON object on stdout. Hooks never block the assistant:
//! every error is swallowed into the hook log and the process exits zero.

pub mod daemon;
pub mod hooks;
pub mod io;
pub mod logfile;
pub mod warnings;

pub use io::{HookInput, HookOutput};
