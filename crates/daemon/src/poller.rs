// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay poller.
//!
//! Every tick, each registered session is processed serially in a fixed
//! order: approvals are ingested into the queue, then at most one inbox
//! message is handled, then a heartbeat is sent if due. Each phase is
//! best-effort; one failing never blocks the others or the next cycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tp_core::{Clock, MessageMeta, SessionId, SessionRecord, SystemClock};
use tp_relay::{NewMessage, RelayApi};

use crate::executor::{Capture, Executor};
use crate::queue::Enqueue;
use crate::state::SharedState;

/// Agent identity the daemon consumes inbox messages under.
pub const AGENT_ID: &str = "daemon";

/// Periodic relay poller; one instance per daemon.
pub struct Poller<R: RelayApi> {
    state: SharedState,
    relay: Arc<R>,
    executor: Arc<Executor<R>>,
    heartbeat_interval: Duration,
}

impl<R: RelayApi + 'static> Poller<R> {
    pub fn new(
        state: SharedState,
        relay: Arc<R>,
        executor: Arc<Executor<R>>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            state,
            relay,
            executor,
            heartbeat_interval,
        }
    }

    /// Run one poll cycle over a snapshot of the registry.
    pub async fn tick(&self) {
        let sessions: Vec<SessionRecord> = {
            let state = self.state.lock();
            state.registry.iter().cloned().collect()
        };

        for session in sessions {
            self.ingest_approvals(&session.id).await;
            self.handle_inbox(&session).await;
            self.maybe_heartbeat(&session.id).await;
        }
    }

    /// Phase 1: queue newly allowed approvals, de-duplicated against the
    /// queue, the execution cache, and the relay-side acknowledged flag.
    async fn ingest_approvals(&self, session_id: &SessionId) {
        let approvals = match self.relay.list_allowed_approvals(session_id).await {
            Ok(approvals) => approvals,
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "approval fetch failed");
                return;
            }
        };

        for approval in approvals {
            if approval.acknowledged {
                continue;
            }
            let mut state = self.state.lock();
            if state.cache.get(&approval.id).is_some() {
                continue;
            }
            let id = approval.id.clone();
            match state.queue.push(approval) {
                Enqueue::Queued => debug!(approval_id = %id, "approval queued"),
                Enqueue::Duplicate => {}
                Enqueue::Full => {
                    warn!(
                        session_id = %session_id,
                        "approval queue full; relay retains ownership"
                    );
                    break;
                }
            }
        }
    }

    /// Phase 2: consume at most one inbox message addressed to the daemon.
    async fn handle_inbox(&self, session: &SessionRecord) {
        let message = match self.relay.next_pending_message(&session.id, AGENT_ID).await {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                debug!(session_id = %session.id, error = %e, "inbox fetch failed");
                return;
            }
        };

        if message.is_command() {
            // Void prior in-flight approvals so they cannot race the new
            // command.
            if let Err(e) = self
                .relay
                .invalidate_approvals(&session.id, "superseded by inbox command")
                .await
            {
                warn!(session_id = %session.id, error = %e, "approval invalidation failed");
            }

            let reply_text = match self.executor.run_inbox_command(session, &message.text).await {
                Ok(capture) => format_reply(&capture),
                Err(reason) => format!("command rejected: {reason}"),
            };

            let reply = NewMessage {
                session_id: session.id.clone(),
                agent_id: message.reply_agent_id().map(str::to_string),
                text: reply_text,
                meta: MessageMeta::Result,
            };
            if let Err(e) = self.relay.post_message(&reply).await {
                warn!(session_id = %session.id, error = %e, "failed to post command reply");
            }
        }

        if let Err(e) = self.relay.ack_message(&message.id).await {
            warn!(message_id = %message.id, error = %e, "failed to ack inbox message");
        }
    }

    /// Phase 3: heartbeat when the last one is older than the interval.
    async fn maybe_heartbeat(&self, session_id: &SessionId) {
        let now_ms = SystemClock.epoch_ms();
        let due = {
            let state = self.state.lock();
            state
                .heartbeats
                .get(session_id)
                .map(|last| now_ms.saturating_sub(*last) >= self.heartbeat_interval.as_millis() as u64)
                .unwrap_or(true)
        };
        if !due {
            return;
        }

        match self.relay.heartbeat(session_id).await {
            // Missing sessions are dropped silently; both outcomes count
            // as "sent" for throttling.
            Ok(_) => {
                self.state.lock().heartbeats.insert(session_id.clone(), now_ms);
            }
            Err(e) => debug!(session_id = %session_id, error = %e, "heartbeat failed"),
        }
    }

    /// Spawn the periodic polling task; stops once shutdown begins.
    pub fn spawn(self: Arc<Self>, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.state.lock().shutting_down {
                    break;
                }
                self.tick().await;
            }
            debug!("poller stopped");
        })
    }
}

/// Human-readable reply body for an inbox command result.
fn format_reply(capture: &Capture) -> String {
    if capture.succeeded() {
        if capture.stdout.is_empty() {
            "(no output)".to_string()
        } else {
            capture.stdout.clone()
        }
    } else if capture.timed_out {
        format!("command timed out\n{}", capture.stderr)
    } else {
        format!(
            "command failed (exit {})\n{}",
            capture
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string()),
            capture.stderr
        )
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
