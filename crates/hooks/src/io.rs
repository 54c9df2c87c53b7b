// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hook stdin/stdout contract.
//!
//! Input is whatever the assistant pipes in; missing fields degrade to
//! defaults rather than failing, because a hook that errors on parse
//! would block the assistant. Output is the response object the
//! assistant understands.

use serde::{Deserialize, Serialize};

/// JSON object read from stdin at hook invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub cwd: String,
}

impl HookInput {
    /// Parse hook input; malformed or empty input becomes the default.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn read_stdin() -> Self {
        use std::io::Read;
        let mut raw = String::new();
        let _ = std::io::stdin().read_to_string(&mut raw);
        Self::parse(&raw)
    }
}

/// The assistant-recognized response shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
    pub suppress_output: bool,
}

/// Per-event decision payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub permission_decision: String,
    #[serde(default)]
    pub permission_decision_reason: String,
}

impl HookOutput {
    /// The do-nothing response: no decision, output suppressed.
    pub fn neutral(event_name: &str) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: event_name.to_string(),
                permission_decision: "neutral".to_string(),
                permission_decision_reason: String::new(),
            }),
            suppress_output: true,
        }
    }

    /// Deny the pending tool call with `reason`. This is the context-delivery
    /// vehicle: the reason text is surfaced into the conversation.
    pub fn deny(event_name: &str, reason: String) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: event_name.to_string(),
                permission_decision: "deny".to_string(),
                permission_decision_reason: reason,
            }),
            suppress_output: true,
        }
    }

    /// Serialize for stdout; infallible (falls back to the empty object).
    pub fn to_stdout_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
