// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tp status`: daemon health at a glance.

use tp_core::{Settings, StatePaths};
use tp_daemon::lock::{process_alive, read_pid_file};

use crate::daemon_process::read_startup_error;

use super::fetch_health;

pub async fn run() -> i32 {
    let Ok(paths) = StatePaths::resolve() else {
        eprintln!("error: could not determine state directory");
        return 1;
    };
    let settings = Settings::load(&paths.state_dir).unwrap_or_default();

    match fetch_health(settings.daemon.port).await {
        Ok(health) => {
            println!("daemon: running (port {})", settings.daemon.port);
            println!("  uptime:     {}s", health["uptime_seconds"]);
            println!("  sessions:   {}", health["sessions"]);
            println!("  queue:      {}", health["queue"]);
            println!("  executions: {}", health["executions"]);
            0
        }
        Err(_) => {
            match read_pid_file(&paths.pid_file()) {
                Some(pid) if process_alive(pid) => {
                    println!("daemon: unresponsive (pid {pid} alive, control port not answering)");
                }
                Some(pid) => {
                    println!("daemon: not running (stale pid file: {pid})");
                }
                None => {
                    println!("daemon: not running");
                }
            }
            if let Some(error) = read_startup_error(&paths) {
                println!("  last startup error:");
                for line in error.lines() {
                    println!("    {line}");
                }
            }
            1
        }
    }
}
