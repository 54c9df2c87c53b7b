// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle supervisor: shuts the daemon down after a configurable period
//! with zero registered sessions.
//!
//! The emptiness check and the shutdown decision happen under the state
//! lock, so a registration racing the check either lands first (and
//! aborts the shutdown by bumping activity) or observes a daemon that
//! has already committed to stopping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::state::SharedState;

/// Periodic idle checker; triggers the shared shutdown path.
pub struct IdleSupervisor {
    state: SharedState,
    shutdown: Arc<Notify>,
    idle_timeout: Duration,
}

impl IdleSupervisor {
    pub fn new(state: SharedState, shutdown: Arc<Notify>, idle_timeout: Duration) -> Self {
        Self {
            state,
            shutdown,
            idle_timeout,
        }
    }

    /// Run one idle check. Returns true when shutdown was triggered.
    pub fn check(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if state.shutting_down {
            return false;
        }
        if !state.idle_expired(now, self.idle_timeout) {
            return false;
        }

        // Final re-check is implicit: we still hold the lock, so no
        // registration can have landed since idle_expired looked.
        info!(
            idle_secs = self.idle_timeout.as_secs(),
            "no sessions for the idle timeout; shutting down"
        );
        state.shutting_down = true;
        self.shutdown.notify_waiters();
        true
    }

    /// Spawn the periodic check task.
    pub fn spawn(self: Arc<Self>, check_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if self.check(Instant::now()) {
                    break;
                }
                if self.state.lock().shutting_down {
                    break;
                }
            }
            debug!("idle supervisor stopped");
        })
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
