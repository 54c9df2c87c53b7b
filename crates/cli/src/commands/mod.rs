// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator commands.

pub mod daemon;
pub mod doctor;
pub mod status;

use std::time::Duration;

/// Per-request budget when talking to the local daemon.
pub(crate) const DAEMON_TIMEOUT: Duration = Duration::from_secs(2);

/// Fetch the daemon health summary from the control surface.
pub(crate) async fn fetch_health(port: u16) -> Result<serde_json::Value, String> {
    let client = reqwest::Client::builder()
        .timeout(DAEMON_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;
    let resp = client
        .get(format!("http://127.0.0.1:{port}/health"))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("daemon returned {}", resp.status()));
    }
    resp.json().await.map_err(|e| e.to_string())
}
