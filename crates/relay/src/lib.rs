// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tp-relay: typed client for the relay HTTP service.
//!
//! The relay is the shared source of truth for sessions, approvals,
//! inbox messages, and stored results. Everything here is "as consumed":
//! the daemon and hooks are authorized mutators via a bearer secret, not
//! owners.

mod api;
mod client;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use api::{
    CreatedApproval, DaemonStatePatch, ExecutionResultPayload, HeartbeatOutcome, NewApproval,
    NewMessage, PendingResult, RelayApi, RelayError, RelaySession,
};
pub use client::RelayClient;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRelay;
