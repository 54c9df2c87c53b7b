// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's single owning state struct.
//!
//! Registry, queue, execution cache, heartbeat bookkeeping, and the
//! activity timestamp live behind one mutex. Single-writer discipline is
//! structural: every mutation goes through this struct, and the idle
//! check is atomic with the registrations it races against.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use tp_core::{SessionId, SessionRecord};

use crate::cache::ExecutionCache;
use crate::queue::ApprovalQueue;
use crate::registry::SessionRegistry;

/// Shared handle to the daemon state.
pub type SharedState = Arc<Mutex<DaemonState>>;

/// Process-wide daemon state.
#[derive(Debug)]
pub struct DaemonState {
    pub registry: SessionRegistry,
    pub queue: ApprovalQueue,
    pub cache: ExecutionCache,
    /// Last heartbeat sent per session (epoch ms).
    pub heartbeats: HashMap<SessionId, u64>,
    /// Bumped by register/update/lookup; drives idle shutdown.
    pub last_activity: Instant,
    /// Set once shutdown begins; loops observe it and stop scheduling.
    pub shutting_down: bool,
}

impl DaemonState {
    pub fn new(now: Instant) -> Self {
        Self {
            registry: SessionRegistry::new(),
            queue: ApprovalQueue::new(),
            cache: ExecutionCache::new(),
            heartbeats: HashMap::new(),
            last_activity: now,
            shutting_down: false,
        }
    }

    pub fn shared(now: Instant) -> SharedState {
        Arc::new(Mutex::new(Self::new(now)))
    }

    /// Register (upsert) a session and bump activity.
    pub fn register_session(&mut self, record: SessionRecord, now: Instant) -> bool {
        self.last_activity = now;
        self.registry.register(record)
    }

    /// Remove a session and its heartbeat counter.
    pub fn deregister_session(&mut self, id: &SessionId, now: Instant) -> bool {
        self.last_activity = now;
        self.heartbeats.remove(id);
        self.registry.deregister(id)
    }

    /// Look up a session, bumping activity. Misses are recovered from the
    /// relay by the caller and re-inserted via [`Self::register_session`].
    pub fn lookup_session(&mut self, id: &SessionId, now: Instant) -> Option<SessionRecord> {
        self.last_activity = now;
        self.registry.get(id).cloned()
    }

    /// Sweep expired execution records and heartbeat counters for
    /// sessions that are no longer registered.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let removed = self.cache.sweep(now_ms);
        let registry = &self.registry;
        self.heartbeats.retain(|id, _| registry.contains(id));
        removed
    }

    /// Whether the idle supervisor may shut the daemon down: no sessions
    /// and no activity for `idle_timeout`. Callers hold the state lock,
    /// which makes this check atomic with concurrent registrations.
    pub fn idle_expired(&self, now: Instant, idle_timeout: std::time::Duration) -> bool {
        self.registry.is_empty() && now.duration_since(self.last_activity) >= idle_timeout
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
