// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approvals and execution records.
//!
//! The relay owns an approval while it is pending or allowed; once the
//! daemon queues it, the daemon owns the rest of the state machine:
//! queued → executing → completed | failed. Transitions are monotonic.

use serde::{Deserialize, Serialize};

use crate::id::{ApprovalId, SessionId};

/// Cap on captured stdout/stderr per execution, before the marker line.
pub const MAX_CAPTURED_OUTPUT_BYTES: usize = 100_000;

/// A remote permission grant for a specific tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    #[serde(alias = "approval_id")]
    pub id: ApprovalId,
    pub session_id: SessionId,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub queued_at_ms: u64,
    /// Whether the daemon has claimed this approval at the relay.
    #[serde(default)]
    pub acknowledged: bool,
}

impl Approval {
    /// The shell command embedded in the tool input, if any.
    ///
    /// Presence of a command selects the fast execution path (subject to
    /// the command guard); absence selects delegation to the assistant.
    pub fn command(&self) -> Option<&str> {
        self.tool_input.get("command").and_then(|v| v.as_str())
    }

    /// Prompt text for the delegated path: an explicit `prompt` field,
    /// the raw command string, or the whole input rendered as JSON.
    pub fn prompt_text(&self) -> String {
        if let Some(p) = self.tool_input.get("prompt").and_then(|v| v.as_str()) {
            return p.to_string();
        }
        if let Some(c) = self.command() {
            return c.to_string();
        }
        self.tool_input.to_string()
    }
}

/// Daemon-side execution status of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Executing,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The result of running an approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub approval_id: ApprovalId,
    pub status: ExecutionStatus,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub timed_out: bool,
}

impl ExecutionRecord {
    /// A fresh record for an approval that just started executing.
    pub fn executing(approval_id: ApprovalId, started_at_ms: u64) -> Self {
        Self {
            approval_id,
            status: ExecutionStatus::Executing,
            started_at_ms,
            completed_at_ms: None,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            duration_ms: None,
            timed_out: false,
        }
    }

    /// Finalize as failed without ever spawning a child.
    pub fn fail(mut self, error: impl Into<String>, completed_at_ms: u64) -> Self {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.exit_code = Some(-1);
        self.completed_at_ms = Some(completed_at_ms);
        self.duration_ms = Some(completed_at_ms.saturating_sub(self.started_at_ms));
        self
    }
}

/// Render a captured stream bounded to [`MAX_CAPTURED_OUTPUT_BYTES`].
///
/// `stored` is the retained prefix of the stream and `total_len` the full
/// number of bytes the child produced (readers keep draining past the cap
/// so the pipe never stalls, but only count). When the stream was longer
/// than the cap a marker line naming the omitted byte count is appended.
pub fn truncate_output(stored: &[u8], total_len: usize) -> String {
    let stored = if stored.len() > MAX_CAPTURED_OUTPUT_BYTES {
        &stored[..MAX_CAPTURED_OUTPUT_BYTES]
    } else {
        stored
    };
    let text = String::from_utf8_lossy(stored);
    if total_len <= MAX_CAPTURED_OUTPUT_BYTES {
        return text.into_owned();
    }

    // Cut on a char boundary at or below the cap.
    let mut cut = stored.len().min(MAX_CAPTURED_OUTPUT_BYTES);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let omitted = total_len - cut;
    format!(
        "{}\n[output truncated: {} bytes omitted]",
        &text[..cut],
        omitted
    )
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
