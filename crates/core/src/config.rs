// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered runtime configuration.
//!
//! Values come from `config.toml` in the state directory, overridden by
//! environment variables. The environment always wins so hooks invoked
//! with ad-hoc settings behave predictably.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Relay endpoint and bearer secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySettings {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl RelaySettings {
    /// Whether both the URL and the secret are present.
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }
}

/// Daemon tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Loopback port for the control HTTP surface.
    pub port: u16,
    /// Relay poll interval, milliseconds.
    pub poll_interval_ms: u64,
    /// Hard timeout for executed children, milliseconds.
    pub child_timeout_ms: u64,
    /// Idle period with zero sessions before shutdown, milliseconds.
    pub idle_timeout_ms: u64,
    /// Interval between idle checks, milliseconds.
    pub idle_check_interval_ms: u64,
    /// Minimum spacing between per-session heartbeats, milliseconds.
    pub heartbeat_interval_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            port: 3050,
            poll_interval_ms: 5_000,
            child_timeout_ms: 600_000,
            idle_timeout_ms: 1_800_000,
            idle_check_interval_ms: 300_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl DaemonSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn child_timeout(&self) -> Duration {
        Duration::from_millis(self.child_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Full settings tree as stored in `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub relay: RelaySettings,
    pub daemon: DaemonSettings,
}

impl Settings {
    /// Load settings: `config.toml` under `state_dir` (missing file means
    /// defaults), then environment overrides.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let path = state_dir.join("config.toml");
        let mut settings = if path.exists() {
            let raw =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(path, e))?
        } else {
            Settings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Apply the environment variable overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RELAY_API_URL") {
            if !url.is_empty() {
                self.relay.api_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("RELAY_API_KEY") {
            if !key.is_empty() {
                self.relay.api_key = Some(key);
            }
        }
        if let Some(port) = env_parse::<u16>("TELEPORTATION_DAEMON_PORT") {
            self.daemon.port = port;
        }
        if let Some(ms) = env_parse("DAEMON_POLL_INTERVAL_MS") {
            self.daemon.poll_interval_ms = ms;
        }
        if let Some(ms) = env_parse("DAEMON_CHILD_TIMEOUT_MS") {
            self.daemon.child_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("DAEMON_IDLE_TIMEOUT_MS") {
            self.daemon.idle_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("DAEMON_IDLE_CHECK_INTERVAL_MS") {
            self.daemon.idle_check_interval_ms = ms;
        }
        if let Some(ms) = env_parse("DAEMON_HEARTBEAT_INTERVAL_MS") {
            self.daemon.heartbeat_interval_ms = ms;
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// Resolve the per-user state directory:
/// `TELEPORTATION_STATE_DIR` > `$HOME/.teleportation`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("TELEPORTATION_STATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".teleportation"))
}

/// Well-known file layout inside the state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub state_dir: PathBuf,
}

impl StatePaths {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self::new(state_dir()?))
    }

    pub fn pid_file(&self) -> PathBuf {
        self.state_dir.join("daemon.pid")
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join("daemon.log")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.state_dir.join("credentials.json")
    }

    pub fn session_marker(&self) -> PathBuf {
        self.state_dir.join("session.marker")
    }

    pub fn heartbeat_pid_file(&self, session_id: &str) -> PathBuf {
        self.state_dir.join(format!("heartbeat-{session_id}.pid"))
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join("config.toml")
    }
}

/// Write `contents` to `path` with owner-only permissions (0600).
///
/// Everything under the state directory (PID file, credentials, markers)
/// must use the restrictive mode.
pub fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // Re-apply in case the file pre-existed with looser bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
