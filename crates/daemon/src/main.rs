// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Teleportation Daemon (tpd) entry point.
//!
//! The daemon is typically started by a session-start hook or the `tp`
//! CLI and should not normally be invoked directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use tp_core::Clock;
use tp_daemon::executor::{spawn_worker, Executor};
use tp_daemon::idle::IdleSupervisor;
use tp_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use tp_daemon::poller::Poller;
use tp_daemon::server::{self, ServerCtx};
use tp_daemon::{env, LockError};

/// Interval between execution-cache/heartbeat sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How long shutdown waits for the HTTP server to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tpd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tpd {}", env!("CARGO_PKG_VERSION"));
                println!("Teleportation daemon - executes remotely approved commands");
                println!();
                println!("USAGE:");
                println!("    tpd");
                println!();
                println!("The daemon is typically started by a session-start hook or the");
                println!("`tp` CLI and should not be invoked directly. It listens on a");
                println!("loopback HTTP port for hooks and polls the relay for work.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tpd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.paths.log_file());

    // Write startup marker to log (before tracing setup, so the CLI can
    // find where this attempt begins)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting user-level daemon");

    let StartupResult {
        lock,
        listener,
        state,
        relay,
        shutdown,
        start_time,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::Lock(LockError::AlreadyRunning { pid })) => {
            eprintln!("tpd is already running");
            eprintln!("  pid: {pid}");
            std::process::exit(1);
        }
        Err(e) => {
            // Write the error synchronously (tracing is non-blocking and
            // may not flush before the process exits)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let settings = config.settings.daemon.clone();

    // Control HTTP server
    let ctx = Arc::new(ServerCtx {
        state: state.clone(),
        start_time,
    });
    let server_task = tokio::spawn(server::serve(listener, ctx, Arc::clone(&shutdown)));

    // Serial executor worker
    let executor = Arc::new(Executor::new(
        state.clone(),
        Arc::clone(&relay),
        settings.child_timeout(),
        env::assistant_bin(),
    ));
    let worker_task = spawn_worker(Arc::clone(&executor));

    // Relay poller
    let poller = Arc::new(Poller::new(
        state.clone(),
        Arc::clone(&relay),
        Arc::clone(&executor),
        settings.heartbeat_interval(),
    ));
    let poller_task = poller.spawn(settings.poll_interval());

    // Idle supervisor
    let idle = Arc::new(IdleSupervisor::new(
        state.clone(),
        Arc::clone(&shutdown),
        settings.idle_timeout(),
    ));
    let idle_task = idle.spawn(settings.idle_check_interval());

    // Hourly sweep of expired execution records and orphaned heartbeats
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now_ms = tp_core::SystemClock.epoch_ms();
            let removed = sweep_state.lock().sweep(now_ms);
            if removed > 0 {
                info!(removed, "swept expired execution records");
            }
        }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(port = settings.port, "Daemon ready");

    // Signal ready for the parent process (hook or CLI waiting for startup)
    println!("READY");

    tokio::select! {
        _ = shutdown.notified() => {
            info!("Shutdown requested (idle supervisor or control surface)");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    // 1. Stop the loops from scheduling further work
    state.lock().shutting_down = true;

    // 2. Drain the HTTP server (rejects new connections, finishes in-flight)
    shutdown.notify_waiters();
    if tokio::time::timeout(DRAIN_TIMEOUT, server_task).await.is_err() {
        warn!("HTTP server did not drain in time");
    }

    // 3. Let the worker and poller observe the flag and stop. Running
    //    children are not killed here; the executor timeout bounds them.
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, worker_task).await;
    poller_task.abort();
    idle_task.abort();

    // 4. Release the PID lock
    if let Err(e) = lock.release() {
        warn!("Failed to release PID lock: {}", e);
    }

    info!("Daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before anything else.
/// The CLI uses this to find where the current startup attempt begins.
/// Full format: "--- tpd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- tpd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    std::fs::create_dir_all(&config.paths.state_dir)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.paths.log_file())?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write a startup error synchronously so it is visible to the CLI even
/// if the process exits immediately.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.paths.log_file())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&config.paths.state_dir)?;

    // Rotation happens at startup via rotate_log_if_needed
    let file_appender =
        tracing_appender::rolling::never(&config.paths.state_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
