// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serial executor for approved tool invocations.
//!
//! One approval at a time, by design: bounded system load and trivially
//! correct de-duplication. The command guard's verdict selects between
//! two dispatch paths: a guarded shell fast path and delegation to the
//! assistant CLI.
//!
//! The approval is acknowledged at the relay strictly before the child
//! spawns; that ordering is what prevents a racing local approval from
//! double-executing. Ack failures are tolerated because the execution
//! cache short-circuits re-entry for an approval already executing.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use tp_core::{
    truncate_output, Approval, ApprovalId, Clock, ExecutionRecord, ExecutionStatus,
    SessionRecord, SystemClock, MAX_CAPTURED_OUTPUT_BYTES,
};
use tp_relay::{ExecutionResultPayload, RelayApi};

use crate::guard::{CommandGuard, Verdict};
use crate::state::SharedState;

/// Grace period between the polite signal and the hard kill on timeout.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Sleep between queue polls when the queue is empty.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Captured outcome of one child process.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl Capture {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// How an approval's tool input is dispatched.
enum Dispatch {
    /// Guard-allowed shell command, run directly.
    Fast(String),
    /// No runnable command; hand the intent to the assistant CLI.
    Delegated(String),
    /// Injection pattern; recorded as a failure, nothing spawns.
    Deny(String),
}

/// Drives approvals to completion and reports outcomes.
pub struct Executor<R: RelayApi> {
    state: SharedState,
    relay: Arc<R>,
    guard: CommandGuard,
    child_timeout: Duration,
    assistant_bin: String,
    daemon_pid: u32,
}

impl<R: RelayApi> Executor<R> {
    pub fn new(
        state: SharedState,
        relay: Arc<R>,
        child_timeout: Duration,
        assistant_bin: String,
    ) -> Self {
        Self {
            state,
            relay,
            guard: CommandGuard::new(),
            child_timeout,
            assistant_bin,
            daemon_pid: std::process::id(),
        }
    }

    /// Execute one approval end to end and report the outcome.
    pub async fn run_approval(&self, approval: Approval) {
        let id = approval.id.clone();

        // Short-circuit duplicates and claim the executing slot in one
        // critical section.
        {
            let mut state = self.state.lock();
            if state.cache.blocks_execution(&id) {
                debug!(approval_id = %id, "approval already executing or finished; skipping");
                return;
            }
            state
                .cache
                .insert(ExecutionRecord::executing(id.clone(), epoch_ms()));
        }

        let Some((session, recovered)) = self.resolve_session(&approval).await else {
            self.finish(
                &approval,
                None,
                ExecutionRecord::executing(id.clone(), epoch_ms())
                    .fail("session not registered", epoch_ms()),
            )
            .await;
            return;
        };

        // Validate the session is still active at the relay. Skipped when
        // the registry miss was just recovered from that same endpoint.
        if !recovered && !self.session_active(&approval).await {
            self.finish(
                &approval,
                approval.command().map(str::to_string),
                ExecutionRecord::executing(id.clone(), epoch_ms())
                    .fail("security: session no longer active at relay", epoch_ms()),
            )
            .await;
            return;
        }

        // Acknowledge before the child spawns. Failure is tolerated; the
        // cache already guards re-entry.
        if let Err(e) = self.relay.ack_approval(&id).await {
            warn!(approval_id = %id, error = %e, "approval ack failed; executing anyway");
        }

        let started_at_ms = epoch_ms();
        let command = approval.command().map(str::to_string);
        let outcome = match self.select(&approval) {
            Dispatch::Deny(reason) => {
                info!(approval_id = %id, reason = %reason, "command denied");
                self.finish(
                    &approval,
                    command,
                    ExecutionRecord::executing(id.clone(), started_at_ms)
                        .fail(reason, epoch_ms()),
                )
                .await;
                return;
            }
            Dispatch::Fast(cmd) => self.run_shell(&session.cwd, &cmd).await,
            Dispatch::Delegated(prompt) => self.run_assistant(&session, &prompt).await,
        };

        let record = match outcome {
            Ok(capture) => finalize(id.clone(), started_at_ms, epoch_ms(), capture),
            Err(message) => {
                ExecutionRecord::executing(id.clone(), started_at_ms).fail(message, epoch_ms())
            }
        };
        self.finish(&approval, command, record).await;
    }

    /// Run an inbox command with the same dispatch rule as approvals.
    /// Injection denials return `Err` with the reason instead of running.
    pub async fn run_inbox_command(
        &self,
        session: &SessionRecord,
        text: &str,
    ) -> Result<Capture, String> {
        match self.guard.evaluate(text) {
            Verdict::Denied { reason } => Err(reason),
            verdict if verdict.permits_direct_execution() => {
                self.run_shell(&session.cwd, text).await
            }
            _ => self.run_assistant(session, text).await,
        }
    }

    fn select(&self, approval: &Approval) -> Dispatch {
        match approval.command() {
            Some(command) => match self.guard.evaluate(command) {
                Verdict::Allowed | Verdict::AllowedByBypass => Dispatch::Fast(command.to_string()),
                Verdict::NotWhitelisted => Dispatch::Delegated(approval.prompt_text()),
                Verdict::Denied { reason } => Dispatch::Deny(reason),
            },
            None => Dispatch::Delegated(approval.prompt_text()),
        }
    }

    /// Registry lookup with one best-effort relay recovery on miss.
    /// Returns the record and whether it came from the relay just now.
    async fn resolve_session(&self, approval: &Approval) -> Option<(SessionRecord, bool)> {
        let now = SystemClock.now();
        if let Some(record) = self.state.lock().lookup_session(&approval.session_id, now) {
            return Some((record, false));
        }

        debug!(session_id = %approval.session_id, "registry miss; recovering from relay");
        match self.relay.fetch_session(&approval.session_id).await {
            Ok(Some(remote)) => {
                let record = remote.to_record(epoch_ms(), self.daemon_pid)?;
                self.state
                    .lock()
                    .register_session(record.clone(), SystemClock.now());
                Some((record, true))
            }
            _ => None,
        }
    }

    async fn session_active(&self, approval: &Approval) -> bool {
        matches!(
            self.relay.fetch_session(&approval.session_id).await,
            Ok(Some(_))
        )
    }

    async fn run_shell(&self, cwd: &Path, command: &str) -> Result<Capture, String> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        self.run_child(cmd, "command").await
    }

    async fn run_assistant(&self, session: &SessionRecord, prompt: &str) -> Result<Capture, String> {
        let mut cmd = Command::new(&self.assistant_bin);
        cmd.arg("--resume")
            .arg(&session.claude_session_id)
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("text")
            .arg("--dangerously-skip-permissions")
            .current_dir(&session.cwd);
        self.run_child(cmd, "assistant CLI").await
    }

    async fn run_child(&self, mut cmd: Command, what: &str) -> Result<Capture, String> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn {what}: {e}"))?;
        let stdout_task = tokio::spawn(drain_capped(child.stdout.take()));
        let stderr_task = tokio::spawn(drain_capped(child.stderr.take()));

        let mut timed_out = false;
        let status = match tokio::time::timeout(self.child_timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => return Err(format!("failed waiting on {what}: {e}")),
            Err(_) => {
                timed_out = true;
                warn!(
                    timeout_secs = self.child_timeout.as_secs(),
                    "{what} timed out; terminating"
                );
                if let Some(pid) = child.id() {
                    polite_kill(pid);
                }
                match tokio::time::timeout(KILL_GRACE, child.wait()).await {
                    Ok(Ok(status)) => Some(status),
                    _ => {
                        let _ = child.kill().await;
                        child.wait().await.ok()
                    }
                }
            }
        };

        let (out_stored, out_total) = stdout_task.await.unwrap_or_default();
        let (err_stored, err_total) = stderr_task.await.unwrap_or_default();

        Ok(Capture {
            exit_code: status.and_then(|s| s.code()),
            stdout: truncate_output(&out_stored, out_total),
            stderr: truncate_output(&err_stored, err_total),
            timed_out,
        })
    }

    /// Store the final record, then report it to the relay's executed and
    /// results endpoints. Each post is retried once on transport failure.
    async fn finish(&self, approval: &Approval, command: Option<String>, record: ExecutionRecord) {
        self.state.lock().cache.insert(record.clone());

        if let Err(e) = self
            .with_retry(|| self.relay.report_executed(&approval.id, &record))
            .await
        {
            warn!(approval_id = %approval.id, error = %e, "failed to report execution");
        }

        let payload = ExecutionResultPayload::from_record(&record, command);
        if let Err(e) = self
            .with_retry(|| self.relay.store_result(&approval.session_id, &payload))
            .await
        {
            warn!(approval_id = %approval.id, error = %e, "failed to store result");
        }
    }

    async fn with_retry<F, Fut>(&self, call: F) -> Result<(), tp_relay::RelayError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), tp_relay::RelayError>>,
    {
        match call().await {
            Err(e) if e.is_transient() => call().await,
            other => other,
        }
    }
}

/// Spawn the single queue-draining worker task.
pub fn spawn_worker<R: RelayApi + 'static>(
    executor: Arc<Executor<R>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let next = {
                let mut state = executor.state.lock();
                if state.shutting_down {
                    break;
                }
                state.queue.pop_front()
            };
            match next {
                Some(approval) => executor.run_approval(approval).await,
                None => tokio::time::sleep(IDLE_POLL).await,
            }
        }
        debug!("executor worker stopped");
    })
}

/// Build the terminal record for a finished child.
fn finalize(
    approval_id: ApprovalId,
    started_at_ms: u64,
    completed_at_ms: u64,
    capture: Capture,
) -> ExecutionRecord {
    let mut record = ExecutionRecord::executing(approval_id, started_at_ms);
    let succeeded = capture.succeeded();
    record.stdout = capture.stdout;
    record.stderr = capture.stderr;
    record.exit_code = capture.exit_code;
    record.timed_out = capture.timed_out;
    record.completed_at_ms = Some(completed_at_ms);
    record.duration_ms = Some(completed_at_ms.saturating_sub(started_at_ms));
    if succeeded {
        record.status = ExecutionStatus::Completed;
    } else {
        record.status = ExecutionStatus::Failed;
        record.error = Some(if capture.timed_out {
            "timed out".to_string()
        } else {
            match capture.exit_code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            }
        });
    }
    record
}

/// Read a child stream to EOF, retaining at most the capture cap while
/// counting everything (so the pipe never fills and the marker can name
/// the omitted byte count).
async fn drain_capped<S: tokio::io::AsyncRead + Unpin>(
    stream: Option<S>,
) -> (Vec<u8>, usize) {
    let Some(mut stream) = stream else {
        return (Vec::new(), 0);
    };
    let mut stored = Vec::new();
    let mut total = 0usize;
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                total += n;
                if stored.len() < MAX_CAPTURED_OUTPUT_BYTES {
                    let take = (MAX_CAPTURED_OUTPUT_BYTES - stored.len()).min(n);
                    stored.extend_from_slice(&buf[..take]);
                }
            }
        }
    }
    (stored, total)
}

/// Ask a child to terminate with SIGTERM.
fn polite_kill(pid: u32) {
    let _ = std::process::Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

fn epoch_ms() -> u64 {
    SystemClock.epoch_ms()
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
