// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The relay contract: request/response types and the `RelayApi` seam.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tp_core::{
    Approval, ApprovalId, ExecutionRecord, InboxMessage, MessageId, MessageMeta, ResultId,
    SessionId, SessionMeta, SessionRecord,
};

/// Relay client errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay not configured (missing RELAY_API_URL or RELAY_API_KEY)")]
    NotConfigured,

    #[error("Relay returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Relay transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay unavailable: {0}")]
    Unavailable(String),
}

impl RelayError {
    /// Transport-level failures are worth one retry; HTTP rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable(_))
    }
}

/// Request body for creating an approval (permission-request hook path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApproval {
    pub session_id: SessionId,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
}

/// The relay's answer to approval creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedApproval {
    pub approval_id: ApprovalId,
    /// `pending` until the user approves, `allowed` when pre-approved.
    pub status: String,
}

impl CreatedApproval {
    pub fn is_allowed(&self) -> bool {
        self.status == "allowed"
    }
}

/// A message to post to the relay (commands, replies, notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub session_id: SessionId,
    /// Agent the message is addressed to (e.g. a `reply_agent_id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub text: String,
    pub meta: MessageMeta,
}

/// Heartbeat outcome. A 404 means the relay no longer knows the session;
/// callers drop it silently per the polling contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Sent,
    UnknownSession,
}

/// Partial update of the relay-side daemon state for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonStatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_away: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
}

impl DaemonStatePatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn stopped(reason: impl Into<String>) -> Self {
        Self {
            status: Some("stopped".into()),
            stopped_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// The relay's view of a session, used for registry recovery and the
/// away-mode check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySession {
    pub session_id: SessionId,
    #[serde(default)]
    pub claude_session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub meta: SessionMeta,
    #[serde(default)]
    pub is_away: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl RelaySession {
    /// Rebuild a registry record from the relay row, if it carries enough.
    pub fn to_record(&self, registered_at_ms: u64, daemon_pid: u32) -> Option<SessionRecord> {
        Some(SessionRecord {
            id: self.session_id.clone(),
            claude_session_id: self.claude_session_id.clone()?,
            cwd: self.cwd.clone()?,
            meta: self.meta.clone(),
            registered_at_ms,
            daemon_pid,
        })
    }
}

/// An execution outcome stored at the relay for later delivery into the
/// assistant conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl ExecutionResultPayload {
    pub fn from_record(record: &ExecutionRecord, command: Option<String>) -> Self {
        Self {
            approval_id: Some(record.approval_id.clone()),
            command,
            status: match record.status {
                tp_core::ExecutionStatus::Completed => "completed".into(),
                tp_core::ExecutionStatus::Failed => "failed".into(),
                tp_core::ExecutionStatus::Executing => "executing".into(),
                tp_core::ExecutionStatus::Queued => "queued".into(),
            },
            exit_code: record.exit_code,
            stdout: record.stdout.clone(),
            stderr: record.stderr.clone(),
        }
    }
}

/// A stored result awaiting delivery to the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResult {
    pub id: ResultId,
    #[serde(flatten)]
    pub payload: ExecutionResultPayload,
    #[serde(default)]
    pub created_at_ms: u64,
}

/// Everything the daemon and hooks ask of the relay.
///
/// A trait so the daemon's poller/executor tests can run against
/// [`crate::FakeRelay`] instead of a live service.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// `GET /api/approvals?status=allowed&session_id=…`
    async fn list_allowed_approvals(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Approval>, RelayError>;

    /// `POST /api/approvals`: create an approval (hook path).
    async fn create_approval(&self, req: &NewApproval) -> Result<CreatedApproval, RelayError>;

    /// `POST /api/approvals/{id}/ack`: claim before execution.
    async fn ack_approval(&self, approval_id: &ApprovalId) -> Result<(), RelayError>;

    /// `POST /api/approvals/{id}/executed`: report the outcome.
    async fn report_executed(
        &self,
        approval_id: &ApprovalId,
        record: &ExecutionRecord,
    ) -> Result<(), RelayError>;

    /// `POST /api/approvals/invalidate`: void pending approvals before a
    /// new inbox command runs.
    async fn invalidate_approvals(
        &self,
        session_id: &SessionId,
        reason: &str,
    ) -> Result<(), RelayError>;

    /// `GET /api/messages/pending?session_id=…&agent_id=…`: at most one.
    async fn next_pending_message(
        &self,
        session_id: &SessionId,
        agent_id: &str,
    ) -> Result<Option<InboxMessage>, RelayError>;

    /// `POST /api/messages`
    async fn post_message(&self, msg: &NewMessage) -> Result<(), RelayError>;

    /// `POST /api/messages/{id}/ack`
    async fn ack_message(&self, message_id: &MessageId) -> Result<(), RelayError>;

    /// `POST /api/sessions/{id}/heartbeat`
    async fn heartbeat(&self, session_id: &SessionId) -> Result<HeartbeatOutcome, RelayError>;

    /// `PATCH /api/sessions/{id}/daemon-state`
    async fn update_daemon_state(
        &self,
        session_id: &SessionId,
        patch: &DaemonStatePatch,
    ) -> Result<(), RelayError>;

    /// `GET /api/sessions/{id}`: recovery and liveness; `None` on 404.
    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RelaySession>, RelayError>;

    /// `POST /api/sessions/{id}/results`
    async fn store_result(
        &self,
        session_id: &SessionId,
        result: &ExecutionResultPayload,
    ) -> Result<(), RelayError>;

    /// `GET /api/sessions/{id}/results/pending`
    async fn pending_results(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<PendingResult>, RelayError>;

    /// `POST /api/sessions/{id}/results/{rid}/delivered`
    async fn mark_result_delivered(
        &self,
        session_id: &SessionId,
        result_id: &ResultId,
    ) -> Result<(), RelayError>;

    /// `POST /api/timeline/log`
    async fn log_timeline_event(
        &self,
        session_id: &SessionId,
        event_type: &str,
        data: serde_json::Value,
    ) -> Result<(), RelayError>;
}
