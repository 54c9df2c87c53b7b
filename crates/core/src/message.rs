// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox messages routed through the relay.
//!
//! Each message targets a `(session, agent)` pair and is consumed at most
//! once; the consumer acknowledges it back to the relay after processing.

use serde::{Deserialize, Serialize};

use crate::id::{MessageId, SessionId};

/// Message kind plus reply routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageMeta {
    /// A command to run on the workstation; the output is posted back to
    /// `reply_agent_id`.
    Command {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_agent_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },
    /// Informational, no action required.
    Info,
    /// The result of earlier work, carried for delivery.
    Result,
}

impl Default for MessageMeta {
    fn default() -> Self {
        Self::Info
    }
}

/// A message fetched from the relay inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub text: String,
    #[serde(default)]
    pub meta: MessageMeta,
}

impl InboxMessage {
    pub fn is_command(&self) -> bool {
        matches!(self.meta, MessageMeta::Command { .. })
    }

    /// The agent a reply should be addressed to, if any.
    pub fn reply_agent_id(&self) -> Option<&str> {
        match &self.meta {
            MessageMeta::Command { reply_agent_id, .. } => reply_agent_id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
