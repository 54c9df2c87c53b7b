// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tp doctor`: local and relay diagnostics.
//!
//! One line per check; exits non-zero when any check fails.

use tp_core::{Settings, SessionId, StatePaths};
use tp_daemon::lock::{process_alive, read_pid_file};
use tp_relay::{RelayApi, RelayClient, RelayError};

use super::fetch_health;

struct Report {
    failures: u32,
}

impl Report {
    fn new() -> Self {
        Self { failures: 0 }
    }

    fn ok(&mut self, check: &str, detail: &str) {
        println!("  ok   {check}: {detail}");
    }

    fn fail(&mut self, check: &str, detail: &str) {
        println!("  FAIL {check}: {detail}");
        self.failures += 1;
    }
}

pub async fn run() -> i32 {
    let mut report = Report::new();
    println!("teleportation doctor");

    let Ok(paths) = StatePaths::resolve() else {
        eprintln!("error: could not determine state directory");
        return 1;
    };

    // State directory
    if paths.state_dir.is_dir() {
        report.ok("state dir", &paths.state_dir.display().to_string());
    } else {
        report.fail(
            "state dir",
            &format!("{} does not exist", paths.state_dir.display()),
        );
    }

    // Configuration
    let settings = match Settings::load(&paths.state_dir) {
        Ok(settings) => {
            report.ok("config", "loaded");
            settings
        }
        Err(e) => {
            report.fail("config", &e.to_string());
            Settings::default()
        }
    };

    // Credentials file
    if paths.credentials_file().exists() {
        report.ok("credentials", "present");
    } else {
        report.fail("credentials", "credentials.json missing (run login)");
    }

    // PID lock liveness
    match read_pid_file(&paths.pid_file()) {
        Some(pid) if process_alive(pid) => report.ok("pid lock", &format!("held by {pid}")),
        Some(pid) => report.fail("pid lock", &format!("stale (pid {pid} is dead)")),
        None => report.ok("pid lock", "not held (daemon stopped)"),
    }

    // Control surface
    match fetch_health(settings.daemon.port).await {
        Ok(health) => report.ok(
            "control port",
            &format!(
                "port {} answering ({} sessions)",
                settings.daemon.port, health["sessions"]
            ),
        ),
        Err(e) => report.fail("control port", &e),
    }

    // Relay reachability and authorization
    match RelayClient::from_settings(&settings.relay) {
        Err(RelayError::NotConfigured) => {
            report.fail("relay", "RELAY_API_URL / RELAY_API_KEY not configured");
        }
        Err(e) => report.fail("relay", &e.to_string()),
        Ok(client) => {
            // Any authorized response proves connectivity; an unknown
            // session 404 maps to Ok(None).
            match client.fetch_session(&SessionId::new("doctor-probe")).await {
                Ok(_) => report.ok("relay", "reachable and authorized"),
                Err(RelayError::Status { status: 401, .. })
                | Err(RelayError::Status { status: 403, .. }) => {
                    report.fail("relay", "authentication rejected (check RELAY_API_KEY)")
                }
                Err(e) => report.fail("relay", &e.to_string()),
            }
        }
    }

    if report.failures == 0 {
        println!("all checks passed");
        0
    } else {
        println!("{} check(s) failed", report.failures);
        1
    }
}
