// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session records tracked by the daemon registry.
//!
//! A session binds the assistant's external id to the internal assistant
//! session id (used for `--resume`) and the working directory commands
//! execute in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::SessionId;

/// Descriptive metadata attached to a session at registration time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A registered session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Internal assistant session id, used to resume assistant context.
    pub claude_session_id: String,
    /// Working directory commands for this session execute in.
    pub cwd: PathBuf,
    #[serde(default)]
    pub meta: SessionMeta,
    /// When the session was (last) registered.
    #[serde(default)]
    pub registered_at_ms: u64,
    /// PID of the daemon that owns the registration.
    #[serde(default)]
    pub daemon_pid: u32,
}

impl SessionRecord {
    pub fn new(id: impl Into<SessionId>, claude_session_id: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            id: id.into(),
            claude_session_id: claude_session_id.into(),
            cwd,
            meta: SessionMeta::default(),
            registered_at_ms: 0,
            daemon_pid: 0,
        }
    }

    pub fn with_meta(mut self, meta: SessionMeta) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
