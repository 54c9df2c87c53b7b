// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback client for the daemon control surface, plus daemon
//! auto-start.
//!
//! Hooks talk to the daemon with a short 2-second budget per call so a
//! wedged daemon cannot stall the assistant. When the daemon is absent,
//! `ensure_running` spawns `tpd` detached and probes with capped
//! exponential back-off.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};

/// Per-call budget for daemon requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Probe back-off schedule for daemon auto-start.
const START_RETRIES: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(1_000),
    Duration::from_millis(1_500),
];

/// Client for the daemon's loopback HTTP surface.
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(port: u16) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: format!("http://127.0.0.1:{port}"),
        }
    }

    /// Whether a daemon answers on the control port.
    pub async fn probe(&self) -> bool {
        self.http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Fetch the health summary.
    pub async fn health(&self) -> Result<Value, String> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        resp.json().await.map_err(|e| e.to_string())
    }

    /// Upsert a session registration.
    pub async fn register_session(
        &self,
        session_id: &str,
        claude_session_id: &str,
        cwd: &str,
    ) -> Result<(), String> {
        self.post(
            "/sessions/register",
            &json!({
                "session_id": session_id,
                "claude_session_id": claude_session_id,
                "cwd": cwd,
                "meta": {"hostname": hostname()},
            }),
        )
        .await
    }

    pub async fn deregister_session(&self, session_id: &str) -> Result<(), String> {
        self.post("/sessions/deregister", &json!({"session_id": session_id}))
            .await
    }

    /// Hand an approval off for execution.
    pub async fn handoff_approval(
        &self,
        approval_id: &str,
        session_id: &str,
        tool_name: &str,
        tool_input: &Value,
    ) -> Result<(), String> {
        self.post(
            "/approvals/handoff",
            &json!({
                "approval_id": approval_id,
                "session_id": session_id,
                "tool_name": tool_name,
                "tool_input": tool_input,
            }),
        )
        .await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<(), String> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("daemon returned {} for {path}", resp.status()))
        }
    }

    /// Ensure a daemon is running: probe, spawn `tpd` if absent, then
    /// re-probe on the back-off schedule. Returns whether a daemon
    /// answered in time.
    pub async fn ensure_running(&self) -> bool {
        if self.probe().await {
            return true;
        }

        if spawn_daemon().is_err() {
            return false;
        }

        for delay in START_RETRIES {
            tokio::time::sleep(delay).await;
            if self.probe().await {
                return true;
            }
        }
        false
    }
}

/// Spawn `tpd` as a detached background process.
fn spawn_daemon() -> Result<(), String> {
    let binary = find_tpd_binary();
    std::process::Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| format!("failed to start {}: {e}", binary.display()))
}

/// Locate the daemon binary: explicit override, then a sibling of the
/// current executable, then PATH.
pub fn find_tpd_binary() -> PathBuf {
    if let Ok(path) = std::env::var("TELEPORTATION_DAEMON_BIN") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tpd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("tpd")
}

fn hostname() -> String {
    std::process::Command::new("hostname")
        .output()
        .ok()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
