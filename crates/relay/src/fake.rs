// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory relay for tests.
//!
//! Records every call in order so tests can assert protocol ordering
//! (ack-before-execute, invalidate-before-dispatch). Individual methods
//! can be made to fail to exercise retry paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use tp_core::{
    Approval, ApprovalId, ExecutionRecord, InboxMessage, MessageId, ResultId, SessionId,
};

use crate::api::{
    CreatedApproval, DaemonStatePatch, ExecutionResultPayload, HeartbeatOutcome, NewApproval,
    NewMessage, PendingResult, RelayApi, RelayError, RelaySession,
};

#[derive(Default)]
struct Inner {
    approvals: HashMap<SessionId, Vec<Approval>>,
    messages: HashMap<SessionId, VecDeque<InboxMessage>>,
    sessions: HashMap<SessionId, RelaySession>,
    results: HashMap<SessionId, Vec<PendingResult>>,
    posted_messages: Vec<NewMessage>,
    executed: Vec<ExecutionRecord>,
    stored_results: Vec<ExecutionResultPayload>,
    delivered: Vec<ResultId>,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    fail_once: HashSet<&'static str>,
    heartbeat_unknown: bool,
    next_approval_status: String,
}

/// Shared fake relay handle (clones observe the same state).
#[derive(Clone, Default)]
pub struct FakeRelay {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        let relay = Self::default();
        relay.inner.lock().next_approval_status = "pending".to_string();
        relay
    }

    /// Seed an allowed approval for a session.
    pub fn push_approval(&self, approval: Approval) {
        let mut inner = self.inner.lock();
        inner
            .approvals
            .entry(approval.session_id.clone())
            .or_default()
            .push(approval);
    }

    /// Seed a pending inbox message.
    pub fn push_message(&self, message: InboxMessage) {
        let mut inner = self.inner.lock();
        inner
            .messages
            .entry(message.session_id.clone())
            .or_default()
            .push_back(message);
    }

    /// Seed a relay-side session row.
    pub fn put_session(&self, session: RelaySession) {
        self.inner
            .lock()
            .sessions
            .insert(session.session_id.clone(), session);
    }

    /// Seed a stored result awaiting delivery.
    pub fn push_result(&self, session_id: SessionId, result: PendingResult) {
        self.inner
            .lock()
            .results
            .entry(session_id)
            .or_default()
            .push(result);
    }

    /// Make `method` fail with a transient error until cleared.
    pub fn fail(&self, method: &'static str) {
        self.inner.lock().failing.insert(method);
    }

    /// Make `method` fail exactly once (for retry tests).
    pub fn fail_once(&self, method: &'static str) {
        self.inner.lock().fail_once.insert(method);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock();
        inner.failing.clear();
        inner.fail_once.clear();
    }

    /// Respond to heartbeats with a 404-equivalent.
    pub fn set_heartbeat_unknown(&self, unknown: bool) {
        self.inner.lock().heartbeat_unknown = unknown;
    }

    /// Status returned by `create_approval` (default `pending`).
    pub fn set_next_approval_status(&self, status: impl Into<String>) {
        self.inner.lock().next_approval_status = status.into();
    }

    /// Ordered call log, e.g. `["ack_approval apv-1", "report_executed apv-1"]`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn posted_messages(&self) -> Vec<NewMessage> {
        self.inner.lock().posted_messages.clone()
    }

    pub fn executed_reports(&self) -> Vec<ExecutionRecord> {
        self.inner.lock().executed.clone()
    }

    pub fn stored_results(&self) -> Vec<ExecutionResultPayload> {
        self.inner.lock().stored_results.clone()
    }

    pub fn delivered_results(&self) -> Vec<ResultId> {
        self.inner.lock().delivered.clone()
    }

    fn record(&self, method: &'static str, detail: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.lock();
        inner.calls.push(if detail.is_empty() {
            method.to_string()
        } else {
            format!("{method} {detail}")
        });
        if inner.fail_once.remove(method) || inner.failing.contains(method) {
            return Err(RelayError::Unavailable(format!("fake failure: {method}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayApi for FakeRelay {
    async fn list_allowed_approvals(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Approval>, RelayError> {
        self.record("list_allowed_approvals", session_id.as_str())?;
        Ok(self
            .inner
            .lock()
            .approvals
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_approval(&self, req: &NewApproval) -> Result<CreatedApproval, RelayError> {
        self.record("create_approval", req.session_id.as_str())?;
        let inner = self.inner.lock();
        Ok(CreatedApproval {
            approval_id: ApprovalId::new(format!("apv-{}", inner.calls.len())),
            status: inner.next_approval_status.clone(),
        })
    }

    async fn ack_approval(&self, approval_id: &ApprovalId) -> Result<(), RelayError> {
        self.record("ack_approval", approval_id.as_str())
    }

    async fn report_executed(
        &self,
        approval_id: &ApprovalId,
        record: &ExecutionRecord,
    ) -> Result<(), RelayError> {
        self.record("report_executed", approval_id.as_str())?;
        self.inner.lock().executed.push(record.clone());
        Ok(())
    }

    async fn invalidate_approvals(
        &self,
        session_id: &SessionId,
        _reason: &str,
    ) -> Result<(), RelayError> {
        self.record("invalidate_approvals", session_id.as_str())?;
        self.inner.lock().approvals.remove(session_id);
        Ok(())
    }

    async fn next_pending_message(
        &self,
        session_id: &SessionId,
        _agent_id: &str,
    ) -> Result<Option<InboxMessage>, RelayError> {
        self.record("next_pending_message", session_id.as_str())?;
        let mut inner = self.inner.lock();
        Ok(inner
            .messages
            .get_mut(session_id)
            .and_then(|q| q.pop_front()))
    }

    async fn post_message(&self, msg: &NewMessage) -> Result<(), RelayError> {
        self.record("post_message", msg.session_id.as_str())?;
        self.inner.lock().posted_messages.push(msg.clone());
        Ok(())
    }

    async fn ack_message(&self, message_id: &MessageId) -> Result<(), RelayError> {
        self.record("ack_message", message_id.as_str())
    }

    async fn heartbeat(&self, session_id: &SessionId) -> Result<HeartbeatOutcome, RelayError> {
        self.record("heartbeat", session_id.as_str())?;
        if self.inner.lock().heartbeat_unknown {
            Ok(HeartbeatOutcome::UnknownSession)
        } else {
            Ok(HeartbeatOutcome::Sent)
        }
    }

    async fn update_daemon_state(
        &self,
        session_id: &SessionId,
        patch: &DaemonStatePatch,
    ) -> Result<(), RelayError> {
        let status = patch.status.clone().unwrap_or_default();
        self.record("update_daemon_state", session_id.as_str())?;
        if let Some(session) = self.inner.lock().sessions.get_mut(session_id) {
            if !status.is_empty() {
                session.status = Some(status);
            }
        }
        Ok(())
    }

    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RelaySession>, RelayError> {
        self.record("fetch_session", session_id.as_str())?;
        Ok(self.inner.lock().sessions.get(session_id).cloned())
    }

    async fn store_result(
        &self,
        session_id: &SessionId,
        result: &ExecutionResultPayload,
    ) -> Result<(), RelayError> {
        self.record("store_result", session_id.as_str())?;
        self.inner.lock().stored_results.push(result.clone());
        Ok(())
    }

    async fn pending_results(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<PendingResult>, RelayError> {
        self.record("pending_results", session_id.as_str())?;
        Ok(self
            .inner
            .lock()
            .results
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_result_delivered(
        &self,
        session_id: &SessionId,
        result_id: &ResultId,
    ) -> Result<(), RelayError> {
        self.record("mark_result_delivered", result_id.as_str())?;
        let mut inner = self.inner.lock();
        inner.delivered.push(result_id.clone());
        if let Some(list) = inner.results.get_mut(session_id) {
            list.retain(|r| &r.id != result_id);
        }
        Ok(())
    }

    async fn log_timeline_event(
        &self,
        session_id: &SessionId,
        event_type: &str,
        _data: serde_json::Value,
    ) -> Result<(), RelayError> {
        self.record(
            "log_timeline_event",
            &format!("{} {}", session_id.as_str(), event_type),
        )
    }
}
