// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

use tp_core::{ConfigError, Settings, StatePaths};
use tp_relay::{RelayClient, RelayError};

use crate::lock::{LockError, PidLock};
use crate::state::{DaemonState, SharedState};

/// Daemon configuration: file layout plus tunables.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: StatePaths,
    pub settings: Settings,
}

impl Config {
    /// Load configuration for the user-level daemon. One daemon serves
    /// all sessions for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        let paths = StatePaths::resolve()?;
        let settings = Settings::load(&paths.state_dir)?;
        Ok(Self { paths, settings })
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Failed to bind 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything `main` needs after a successful startup.
#[derive(Debug)]
pub struct StartupResult {
    pub lock: PidLock,
    pub listener: TcpListener,
    pub state: SharedState,
    pub relay: Arc<RelayClient>,
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
}

/// Start the daemon: state dir, PID lock, relay client, loopback bind.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.paths.state_dir)?;

    // Lock FIRST so a losing racer never tears down the winner's files.
    let lock = PidLock::acquire(&config.paths.pid_file(), std::process::id())?;

    match startup_inner(config).await {
        Ok((listener, relay)) => {
            info!(
                port = listener
                    .local_addr()
                    .map(|a| a.port())
                    .unwrap_or_default(),
                "daemon started"
            );
            Ok(StartupResult {
                lock,
                listener,
                state: DaemonState::shared(Instant::now()),
                relay,
                shutdown: Arc::new(Notify::new()),
                start_time: Instant::now(),
            })
        }
        Err(e) => {
            // The lock is ours; clean it up so the next start is unimpeded.
            let _ = lock.release();
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
) -> Result<(TcpListener, Arc<RelayClient>), LifecycleError> {
    let relay = Arc::new(RelayClient::from_settings(&config.settings.relay)?);

    let port = config.settings.daemon.port;
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| LifecycleError::Bind { port, source })?;

    Ok((listener, relay))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
