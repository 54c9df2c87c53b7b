// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `reqwest`-backed implementation of [`RelayApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use tp_core::{
    Approval, ApprovalId, ExecutionRecord, InboxMessage, MessageId, RelaySettings, ResultId,
    SessionId,
};

use crate::api::{
    CreatedApproval, DaemonStatePatch, ExecutionResultPayload, HeartbeatOutcome, NewApproval,
    NewMessage, PendingResult, RelayApi, RelayError, RelaySession,
};

/// Deadline for every outbound relay call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the relay service.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ApprovalsBody {
    #[serde(default)]
    approvals: Vec<Approval>,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<InboxMessage>,
}

#[derive(Deserialize)]
struct ResultsBody {
    #[serde(default)]
    results: Vec<PendingResult>,
}

impl RelayClient {
    /// Build a client from settings. Fails when the URL or secret is absent.
    pub fn from_settings(settings: &RelaySettings) -> Result<Self, RelayError> {
        let (Some(url), Some(key)) = (settings.api_url.clone(), settings.api_key.clone()) else {
            return Err(RelayError::NotConfigured);
        };
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, RelayError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;
        Self::check(resp, path).await
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, RelayError> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Self::check(resp, path).await
    }

    async fn check(resp: Response, path: &str) -> Result<Response, RelayError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(RelayError::Status {
                status: resp.status().as_u16(),
                path: path.to_string(),
            })
        }
    }
}

#[async_trait]
impl RelayApi for RelayClient {
    async fn list_allowed_approvals(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Approval>, RelayError> {
        let resp = self
            .get(
                "/api/approvals",
                &[("status", "allowed"), ("session_id", session_id.as_str())],
            )
            .await?;
        Ok(resp.json::<ApprovalsBody>().await?.approvals)
    }

    async fn create_approval(&self, req: &NewApproval) -> Result<CreatedApproval, RelayError> {
        let resp = self.post_json("/api/approvals", req).await?;
        Ok(resp.json().await?)
    }

    async fn ack_approval(&self, approval_id: &ApprovalId) -> Result<(), RelayError> {
        self.post_json(&format!("/api/approvals/{approval_id}/ack"), &json!({}))
            .await?;
        Ok(())
    }

    async fn report_executed(
        &self,
        approval_id: &ApprovalId,
        record: &ExecutionRecord,
    ) -> Result<(), RelayError> {
        self.post_json(&format!("/api/approvals/{approval_id}/executed"), record)
            .await?;
        Ok(())
    }

    async fn invalidate_approvals(
        &self,
        session_id: &SessionId,
        reason: &str,
    ) -> Result<(), RelayError> {
        self.post_json(
            "/api/approvals/invalidate",
            &json!({"session_id": session_id, "reason": reason}),
        )
        .await?;
        Ok(())
    }

    async fn next_pending_message(
        &self,
        session_id: &SessionId,
        agent_id: &str,
    ) -> Result<Option<InboxMessage>, RelayError> {
        let resp = self
            .get(
                "/api/messages/pending",
                &[("session_id", session_id.as_str()), ("agent_id", agent_id)],
            )
            .await?;
        Ok(resp.json::<MessageBody>().await?.message)
    }

    async fn post_message(&self, msg: &NewMessage) -> Result<(), RelayError> {
        self.post_json("/api/messages", msg).await?;
        Ok(())
    }

    async fn ack_message(&self, message_id: &MessageId) -> Result<(), RelayError> {
        self.post_json(&format!("/api/messages/{message_id}/ack"), &json!({}))
            .await?;
        Ok(())
    }

    async fn heartbeat(&self, session_id: &SessionId) -> Result<HeartbeatOutcome, RelayError> {
        let path = format!("/api/sessions/{session_id}/heartbeat");
        let resp = self
            .http
            .post(self.url(&path))
            .bearer_auth(&self.api_key)
            .json(&json!({}))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(HeartbeatOutcome::UnknownSession);
        }
        Self::check(resp, &path).await?;
        Ok(HeartbeatOutcome::Sent)
    }

    async fn update_daemon_state(
        &self,
        session_id: &SessionId,
        patch: &DaemonStatePatch,
    ) -> Result<(), RelayError> {
        let path = format!("/api/sessions/{session_id}/daemon-state");
        let resp = self
            .http
            .patch(self.url(&path))
            .bearer_auth(&self.api_key)
            .json(patch)
            .send()
            .await?;
        Self::check(resp, &path).await?;
        Ok(())
    }

    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RelaySession>, RelayError> {
        let path = format!("/api/sessions/{session_id}");
        let resp = self
            .http
            .get(self.url(&path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check(resp, &path).await?;
        Ok(Some(resp.json().await?))
    }

    async fn store_result(
        &self,
        session_id: &SessionId,
        result: &ExecutionResultPayload,
    ) -> Result<(), RelayError> {
        self.post_json(&format!("/api/sessions/{session_id}/results"), result)
            .await?;
        Ok(())
    }

    async fn pending_results(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<PendingResult>, RelayError> {
        let resp = self
            .get(&format!("/api/sessions/{session_id}/results/pending"), &[])
            .await?;
        Ok(resp.json::<ResultsBody>().await?.results)
    }

    async fn mark_result_delivered(
        &self,
        session_id: &SessionId,
        result_id: &ResultId,
    ) -> Result<(), RelayError> {
        self.post_json(
            &format!("/api/sessions/{session_id}/results/{result_id}/delivered"),
            &json!({}),
        )
        .await?;
        Ok(())
    }

    async fn log_timeline_event(
        &self,
        session_id: &SessionId,
        event_type: &str,
        data: serde_json::Value,
    ) -> Result<(), RelayError> {
        self.post_json(
            "/api/timeline/log",
            &json!({"session_id": session_id, "event_type": event_type, "data": data}),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
