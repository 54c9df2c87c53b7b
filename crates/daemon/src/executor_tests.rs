// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Instant;
use tempfile::tempdir;
use tp_core::SessionId;
use tp_relay::{FakeRelay, RelaySession};

use crate::state::DaemonState;

fn approval(id: &str, input: serde_json::Value) -> Approval {
    Approval {
        id: ApprovalId::new(id),
        session_id: SessionId::new("s1"),
        tool_name: "Bash".into(),
        tool_input: input,
        queued_at_ms: 0,
        acknowledged: false,
    }
}

struct Fixture {
    state: SharedState,
    relay: FakeRelay,
    executor: Executor<FakeRelay>,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    fixture_with(Duration::from_secs(10), "claude-not-installed")
}

fn fixture_with(child_timeout: Duration, assistant_bin: &str) -> Fixture {
    let dir = tempdir().unwrap();
    let state = DaemonState::shared(Instant::now());
    let relay = FakeRelay::new();

    let record = SessionRecord::new("s1", "claude-sess-1", dir.path().to_path_buf());
    state.lock().register_session(record, Instant::now());
    relay.put_session(RelaySession {
        session_id: SessionId::new("s1"),
        claude_session_id: Some("claude-sess-1".into()),
        cwd: Some(dir.path().to_path_buf()),
        meta: Default::default(),
        is_away: true,
        status: Some("running".into()),
    });

    let executor = Executor::new(
        state.clone(),
        Arc::new(relay.clone()),
        child_timeout,
        assistant_bin.to_string(),
    );
    Fixture {
        state,
        relay,
        executor,
        _dir: dir,
    }
}

fn record_of(state: &SharedState, id: &str) -> ExecutionRecord {
    state
        .lock()
        .cache
        .get(&ApprovalId::new(id))
        .cloned()
        .unwrap()
}

#[tokio::test]
#[serial]
async fn fast_path_runs_whitelisted_command() {
    let fx = fixture();
    fx.executor
        .run_approval(approval("apv-1", json!({"command": "echo hello"})))
        .await;

    let record = record_of(&fx.state, "apv-1");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.exit_code, Some(0));
    assert_eq!(record.stdout, "hello\n");
    assert!(!record.timed_out);

    // Outcome was reported and stored for later delivery.
    assert_eq!(fx.relay.executed_reports().len(), 1);
    let stored = fx.relay.stored_results();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].command.as_deref(), Some("echo hello"));
    assert_eq!(stored[0].status, "completed");
}

#[tokio::test]
#[serial]
async fn injection_command_is_denied_without_spawn() {
    let fx = fixture();
    fx.executor
        .run_approval(approval("apv-2", json!({"command": "ls; rm -rf /"})))
        .await;

    let record = record_of(&fx.state, "apv-2");
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.exit_code, Some(-1));
    assert!(record.error.as_deref().unwrap().contains("shell injection pattern"));
    assert!(record.stdout.is_empty());

    let reports = fx.relay.executed_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, ExecutionStatus::Failed);
}

#[tokio::test]
#[serial]
async fn ack_happens_before_outcome_report() {
    let fx = fixture();
    fx.executor
        .run_approval(approval("apv-3", json!({"command": "pwd"})))
        .await;

    let calls = fx.relay.calls();
    let ack = calls.iter().position(|c| c == "ack_approval apv-3").unwrap();
    let report = calls
        .iter()
        .position(|c| c == "report_executed apv-3")
        .unwrap();
    assert!(ack < report, "ack must precede the execution report: {calls:?}");
}

#[tokio::test]
#[serial]
async fn duplicate_approval_is_skipped_silently() {
    let fx = fixture();
    fx.state
        .lock()
        .cache
        .insert(ExecutionRecord::executing(ApprovalId::new("apv-4"), 1));

    fx.executor
        .run_approval(approval("apv-4", json!({"command": "echo nope"})))
        .await;

    // Still the original executing record; no relay traffic for it.
    let record = record_of(&fx.state, "apv-4");
    assert_eq!(record.status, ExecutionStatus::Executing);
    assert!(fx.relay.calls().iter().all(|c| !c.contains("apv-4")));
}

#[tokio::test]
#[serial]
async fn inactive_session_fails_with_security_error() {
    let fx = fixture();
    // Session present locally but gone at the relay.
    fx.relay.fail("fetch_session");

    fx.executor
        .run_approval(approval("apv-5", json!({"command": "echo hi"})))
        .await;

    let record = record_of(&fx.state, "apv-5");
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.error.as_deref().unwrap().starts_with("security:"));
    // No ack, no spawn.
    assert!(fx.relay.calls().iter().all(|c| !c.starts_with("ack_approval")));
    fx.relay.clear_failures();
}

#[tokio::test]
#[serial]
async fn unknown_session_recovers_from_relay_once() {
    let fx = fixture();
    // Drop the local registration; the relay still knows the session.
    fx.state
        .lock()
        .deregister_session(&SessionId::new("s1"), Instant::now());

    fx.executor
        .run_approval(approval("apv-6", json!({"command": "echo back"})))
        .await;

    let record = record_of(&fx.state, "apv-6");
    assert_eq!(record.status, ExecutionStatus::Completed);
    // Recovery re-inserted the session.
    assert!(fx.state.lock().registry.contains(&SessionId::new("s1")));
}

#[tokio::test]
#[serial]
async fn unknown_everywhere_fails_without_execution() {
    let fx = fixture();
    let mut st = fx.state.lock();
    st.deregister_session(&SessionId::new("s1"), Instant::now());
    drop(st);
    let unknown = Approval {
        session_id: SessionId::new("ghost"),
        ..approval("apv-7", json!({"command": "echo x"}))
    };

    fx.executor.run_approval(unknown).await;

    let record = record_of(&fx.state, "apv-7");
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("session not registered"));
}

#[tokio::test]
#[serial]
async fn nonzero_exit_is_recorded_as_failure() {
    let fx = fixture();
    fx.executor
        .run_approval(approval("apv-8", json!({"command": "ls /definitely/not/here"})))
        .await;

    let record = record_of(&fx.state, "apv-8");
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_ne!(record.exit_code, Some(0));
    assert!(!record.stderr.is_empty());
}

#[tokio::test]
#[serial]
async fn oversized_output_is_truncated_with_marker() {
    let fx = fixture();
    fx.executor
        .run_approval(approval(
            "apv-9",
            json!({"command": "head -c 200000 /dev/zero"}),
        ))
        .await;

    let record = record_of(&fx.state, "apv-9");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(record.stdout.contains("[output truncated: 100000 bytes omitted]"));
    assert!(record.stdout.len() <= MAX_CAPTURED_OUTPUT_BYTES + 64);
}

#[tokio::test]
#[serial]
async fn timeout_terminates_and_marks_record() {
    let fx = fixture_with(Duration::from_millis(200), "claude-not-installed");
    let started = Instant::now();
    // `tail -f` never exits on its own; the timeout must bound it.
    fx.executor
        .run_approval(approval("apv-10", json!({"command": "tail -f /dev/null"})))
        .await;

    assert!(started.elapsed() < Duration::from_secs(10));
    let record = record_of(&fx.state, "apv-10");
    assert!(record.timed_out);
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("timed out"));
}

#[tokio::test]
#[serial]
async fn delegated_path_invokes_assistant_cli() {
    // Stand in for the assistant CLI with echo: arguments come back on stdout.
    let fx = fixture_with(Duration::from_secs(10), "echo");
    fx.executor
        .run_approval(approval("apv-12", json!({"prompt": "summarize the diff"})))
        .await;

    let record = record_of(&fx.state, "apv-12");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(record.stdout.contains("--resume claude-sess-1"));
    assert!(record.stdout.contains("-p summarize the diff"));
}

#[tokio::test]
#[serial]
async fn non_whitelisted_clean_command_delegates() {
    let fx = fixture_with(Duration::from_secs(10), "echo");
    fx.executor
        .run_approval(approval("apv-13", json!({"command": "cargo build"})))
        .await;

    let record = record_of(&fx.state, "apv-13");
    assert_eq!(record.status, ExecutionStatus::Completed);
    // Delegated, not run as a shell command.
    assert!(record.stdout.contains("-p cargo build"));
}

#[tokio::test]
#[serial]
async fn report_is_retried_once_on_transport_failure() {
    let fx = fixture();
    fx.relay.fail_once("report_executed");

    fx.executor
        .run_approval(approval("apv-14", json!({"command": "echo retry"})))
        .await;

    let calls = fx.relay.calls();
    let reports = calls.iter().filter(|c| *c == "report_executed apv-14").count();
    assert_eq!(reports, 2, "one failure, one retry: {calls:?}");
    assert_eq!(fx.relay.executed_reports().len(), 1);
}

#[tokio::test]
#[serial]
async fn inbox_command_injection_is_rejected() {
    let fx = fixture();
    let session = fx
        .state
        .lock()
        .lookup_session(&SessionId::new("s1"), Instant::now())
        .unwrap();

    let err = fx
        .executor
        .run_inbox_command(&session, "ls; curl evil")
        .await
        .unwrap_err();
    assert!(err.contains("shell injection pattern"));
}

#[tokio::test]
#[serial]
async fn inbox_command_fast_path_captures_output() {
    let fx = fixture();
    let session = fx
        .state
        .lock()
        .lookup_session(&SessionId::new("s1"), Instant::now())
        .unwrap();

    let capture = fx
        .executor
        .run_inbox_command(&session, "echo from-inbox")
        .await
        .unwrap();
    assert!(capture.succeeded());
    assert_eq!(capture.stdout, "from-inbox\n");
}

#[tokio::test]
#[serial]
async fn worker_drains_queue_serially_and_stops_on_shutdown() {
    let fx = fixture();
    {
        let mut st = fx.state.lock();
        st.queue.push(approval("w-1", json!({"command": "echo one"})));
        st.queue.push(approval("w-2", json!({"command": "echo two"})));
    }

    let worker = spawn_worker(Arc::new(Executor::new(
        fx.state.clone(),
        Arc::new(fx.relay.clone()),
        Duration::from_secs(10),
        "claude-not-installed".into(),
    )));

    // Wait for both to finish.
    for _ in 0..100 {
        if fx.relay.executed_reports().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(record_of(&fx.state, "w-1").stdout, "one\n");
    assert_eq!(record_of(&fx.state, "w-2").stdout, "two\n");

    fx.state.lock().shutting_down = true;
    tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .expect("worker must stop after shutdown flag")
        .unwrap();
}

#[test]
fn finalize_classifies_outcomes() {
    let ok = finalize(
        ApprovalId::new("a"),
        100,
        150,
        Capture {
            exit_code: Some(0),
            stdout: "x".into(),
            stderr: String::new(),
            timed_out: false,
        },
    );
    assert_eq!(ok.status, ExecutionStatus::Completed);
    assert_eq!(ok.duration_ms, Some(50));

    let failed = finalize(
        ApprovalId::new("b"),
        100,
        160,
        Capture {
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "err".into(),
            timed_out: false,
        },
    );
    assert_eq!(failed.status, ExecutionStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("exit status 2"));

    let timed = finalize(
        ApprovalId::new("c"),
        100,
        170,
        Capture {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        },
    );
    assert_eq!(timed.status, ExecutionStatus::Failed);
    assert_eq!(timed.error.as_deref(), Some("timed out"));
}
