// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use std::time::Duration;

fn record(id: &str) -> SessionRecord {
    SessionRecord::new(id, "claude-1", PathBuf::from("/w"))
}

#[test]
fn register_bumps_activity() {
    let start = Instant::now();
    let mut state = DaemonState::new(start);
    let later = start + Duration::from_secs(60);

    state.register_session(record("s1"), later);
    assert_eq!(state.last_activity, later);
    assert_eq!(state.registry.len(), 1);
}

#[test]
fn lookup_bumps_activity_even_on_miss() {
    let start = Instant::now();
    let mut state = DaemonState::new(start);
    let later = start + Duration::from_secs(5);

    assert!(state.lookup_session(&SessionId::new("nope"), later).is_none());
    assert_eq!(state.last_activity, later);
}

#[test]
fn deregister_drops_heartbeat_counter() {
    let now = Instant::now();
    let mut state = DaemonState::new(now);
    state.register_session(record("s1"), now);
    state.heartbeats.insert(SessionId::new("s1"), 123);

    assert!(state.deregister_session(&SessionId::new("s1"), now));
    assert!(state.heartbeats.is_empty());
}

#[test]
fn sweep_clears_orphaned_heartbeats() {
    let now = Instant::now();
    let mut state = DaemonState::new(now);
    state.register_session(record("alive"), now);
    state.heartbeats.insert(SessionId::new("alive"), 1);
    state.heartbeats.insert(SessionId::new("gone"), 2);

    state.sweep(0);

    assert!(state.heartbeats.contains_key(&SessionId::new("alive")));
    assert!(!state.heartbeats.contains_key(&SessionId::new("gone")));
}

#[test]
fn idle_expiry_requires_empty_registry_and_elapsed_timeout() {
    let start = Instant::now();
    let mut state = DaemonState::new(start);
    let timeout = Duration::from_secs(1800);

    // Not yet elapsed.
    assert!(!state.idle_expired(start + Duration::from_secs(10), timeout));
    // Elapsed, empty registry.
    assert!(state.idle_expired(start + timeout, timeout));

    // A registered session blocks shutdown regardless of time.
    state.register_session(record("s1"), start);
    assert!(!state.idle_expired(start + timeout * 2, timeout));

    // Deregistration bumps activity, so the timer restarts.
    let dereg_at = start + timeout * 2;
    state.deregister_session(&SessionId::new("s1"), dereg_at);
    assert!(!state.idle_expired(dereg_at + Duration::from_secs(1), timeout));
    assert!(state.idle_expired(dereg_at + timeout, timeout));
}
