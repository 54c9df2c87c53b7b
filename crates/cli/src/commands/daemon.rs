// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tp daemon start|stop|restart`.

use std::time::Duration;

use tp_core::{Settings, StatePaths};

use crate::daemon_process::{read_startup_error, start_daemon_background, stop_daemon};

use super::fetch_health;

/// Probe schedule after spawning tpd.
const START_RETRIES: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(1_000),
    Duration::from_millis(1_500),
];

pub async fn start() -> i32 {
    let Ok(paths) = StatePaths::resolve() else {
        eprintln!("error: could not determine state directory");
        return 1;
    };
    let settings = Settings::load(&paths.state_dir).unwrap_or_default();

    if fetch_health(settings.daemon.port).await.is_ok() {
        println!("daemon already running (port {})", settings.daemon.port);
        return 0;
    }

    if let Err(e) = start_daemon_background() {
        eprintln!("error: {e}");
        return 1;
    }

    for delay in START_RETRIES {
        tokio::time::sleep(delay).await;
        if fetch_health(settings.daemon.port).await.is_ok() {
            println!("daemon started (port {})", settings.daemon.port);
            return 0;
        }
    }

    eprintln!("error: daemon did not answer after start");
    if let Some(error) = read_startup_error(&paths) {
        for line in error.lines() {
            eprintln!("  {line}");
        }
    }
    1
}

pub async fn stop() -> i32 {
    let Ok(paths) = StatePaths::resolve() else {
        eprintln!("error: could not determine state directory");
        return 1;
    };

    match stop_daemon(&paths) {
        Some(pid) => {
            println!("daemon stopped (pid {pid})");
            0
        }
        None => {
            println!("daemon not running");
            0
        }
    }
}

pub async fn restart() -> i32 {
    let code = stop().await;
    if code != 0 {
        return code;
    }
    start().await
}
