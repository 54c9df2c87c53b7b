// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control HTTP surface for hook programs and the operator CLI.
//!
//! Bound to loopback only; localhost is the trust boundary, so there is
//! no authentication. Every handler validates its input at the boundary
//! and answers JSON. Bodies are capped at 1 MiB.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tracing::info;

use tp_core::{
    is_valid_session_id, is_valid_tool_name, Approval, ApprovalId, SessionId, SessionMeta,
    SessionRecord, SystemClock,
};

use crate::queue::Enqueue;
use crate::state::SharedState;

/// Maximum accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared context for all handlers.
pub struct ServerCtx {
    pub state: SharedState,
    pub start_time: Instant,
}

type Reply = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

/// Build the control router.
pub fn router(ctx: Arc<ServerCtx>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions/register", post(register_session))
        .route("/sessions/deregister", post(deregister_session))
        .route("/approvals/handoff", post(handoff))
        .route("/executions/:approval_id", get(get_execution))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ctx)
}

/// Serve until the shutdown notify fires, then drain in-flight requests.
pub async fn serve(
    listener: tokio::net::TcpListener,
    ctx: Arc<ServerCtx>,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
}

async fn health(State(ctx): State<Arc<ServerCtx>>) -> Reply {
    let state = ctx.state.lock();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "uptime_seconds": ctx.start_time.elapsed().as_secs(),
            "sessions": state.registry.len(),
            "queue": state.queue.len(),
            "executions": state.cache.len(),
        })),
    )
}

async fn register_session(State(ctx): State<Arc<ServerCtx>>, Json(body): Json<Value>) -> Reply {
    let Some(session_id) = body.get("session_id").and_then(Value::as_str) else {
        return bad_request("session_id is required");
    };
    if !is_valid_session_id(session_id) {
        return bad_request("invalid session_id");
    }
    let Some(claude_session_id) = body.get("claude_session_id").and_then(Value::as_str) else {
        return bad_request("claude_session_id is required");
    };
    let Some(cwd) = body.get("cwd").and_then(Value::as_str) else {
        return bad_request("cwd is required");
    };
    let meta: SessionMeta = body
        .get("meta")
        .cloned()
        .and_then(|m| serde_json::from_value(m).ok())
        .unwrap_or_default();

    use tp_core::Clock;
    let mut record = SessionRecord::new(session_id, claude_session_id, cwd.into()).with_meta(meta);
    record.registered_at_ms = SystemClock.epoch_ms();
    record.daemon_pid = std::process::id();

    let replaced = ctx
        .state
        .lock()
        .register_session(record, SystemClock.now());
    info!(session_id, replaced, "session registered");
    (StatusCode::OK, Json(json!({"registered": true, "replaced": replaced})))
}

async fn deregister_session(State(ctx): State<Arc<ServerCtx>>, Json(body): Json<Value>) -> Reply {
    let Some(session_id) = body.get("session_id").and_then(Value::as_str) else {
        return bad_request("session_id is required");
    };
    if !is_valid_session_id(session_id) {
        return bad_request("invalid session_id");
    }

    use tp_core::Clock;
    let removed = ctx
        .state
        .lock()
        .deregister_session(&SessionId::new(session_id), SystemClock.now());
    info!(session_id, removed, "session deregistered");
    (StatusCode::OK, Json(json!({"removed": removed})))
}

async fn handoff(State(ctx): State<Arc<ServerCtx>>, Json(body): Json<Value>) -> Reply {
    let Some(approval_id) = body.get("approval_id").and_then(Value::as_str) else {
        return bad_request("approval_id is required");
    };
    if !is_valid_session_id(approval_id) {
        return bad_request("invalid approval_id");
    }
    let Some(session_id) = body.get("session_id").and_then(Value::as_str) else {
        return bad_request("session_id is required");
    };
    if !is_valid_session_id(session_id) {
        return bad_request("invalid session_id");
    }
    let Some(tool_name) = body.get("tool_name").and_then(Value::as_str) else {
        return bad_request("tool_name is required");
    };
    if !is_valid_tool_name(tool_name) {
        return bad_request("invalid tool_name");
    }
    let tool_input = body.get("tool_input").cloned().unwrap_or(json!({}));

    use tp_core::Clock;
    let approval = Approval {
        id: ApprovalId::new(approval_id),
        session_id: SessionId::new(session_id),
        tool_name: tool_name.to_string(),
        tool_input,
        queued_at_ms: SystemClock.epoch_ms(),
        acknowledged: false,
    };

    let mut state = ctx.state.lock();
    // An approval already executing (or finished) must not re-enter the
    // queue; the first handoff won.
    if state.cache.get(&approval.id).is_some() {
        return (
            StatusCode::OK,
            Json(json!({"queued": false, "duplicate": true})),
        );
    }
    match state.queue.push(approval) {
        Enqueue::Queued => {
            info!(approval_id, session_id, "approval handed off");
            (StatusCode::OK, Json(json!({"queued": true})))
        }
        Enqueue::Duplicate => (
            StatusCode::OK,
            Json(json!({"queued": false, "duplicate": true})),
        ),
        Enqueue::Full => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Approval queue full",
                "queue_size": state.queue.len(),
                "max_size": state.queue.capacity(),
            })),
        ),
    }
}

async fn get_execution(
    State(ctx): State<Arc<ServerCtx>>,
    Path(approval_id): Path<String>,
) -> Reply {
    let state = ctx.state.lock();
    match state.cache.get(&ApprovalId::new(approval_id.as_str())) {
        Some(record) => (
            StatusCode::OK,
            Json(serde_json::to_value(record).unwrap_or_else(|_| json!({}))),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
