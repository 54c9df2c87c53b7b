// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded store of execution records.
//!
//! Two eviction mechanisms bound memory: a size ceiling enforced on
//! insert (oldest-completed first, then oldest-started) and a periodic
//! TTL sweep removing completed records older than the retention horizon.

use std::collections::HashMap;

use tp_core::{ApprovalId, ExecutionRecord, ExecutionStatus};

/// Size ceiling for retained execution records.
pub const MAX_CACHE_SIZE: usize = 1_000;

/// Completed records older than this are swept.
pub const RETENTION_MS: u64 = 60 * 60 * 1_000;

/// Execution record cache keyed by approval id.
#[derive(Debug)]
pub struct ExecutionCache {
    records: HashMap<ApprovalId, ExecutionRecord>,
    capacity: usize,
}

impl ExecutionCache {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, id: &ApprovalId) -> Option<&ExecutionRecord> {
        self.records.get(id)
    }

    /// Insert or replace a record, evicting when at capacity.
    pub fn insert(&mut self, record: ExecutionRecord) {
        if !self.records.contains_key(&record.approval_id) && self.records.len() >= self.capacity {
            self.evict_one();
        }
        self.records.insert(record.approval_id.clone(), record);
    }

    /// Evict the oldest-completed record; with no completed records, the
    /// oldest-started.
    fn evict_one(&mut self) {
        let completed = self
            .records
            .values()
            .filter(|r| r.status.is_terminal())
            .min_by_key(|r| r.completed_at_ms.unwrap_or(u64::MAX))
            .map(|r| r.approval_id.clone());

        let victim = completed.or_else(|| {
            self.records
                .values()
                .min_by_key(|r| r.started_at_ms)
                .map(|r| r.approval_id.clone())
        });

        if let Some(id) = victim {
            self.records.remove(&id);
        }
    }

    /// Remove completed records older than [`RETENTION_MS`]. Returns the
    /// number removed.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| {
            !(r.status.is_terminal()
                && r.completed_at_ms
                    .is_some_and(|done| now_ms.saturating_sub(done) > RETENTION_MS))
        });
        before - self.records.len()
    }

    /// Whether this approval is already executing or finished; used to
    /// short-circuit duplicate executions.
    pub fn blocks_execution(&self, id: &ApprovalId) -> bool {
        self.records
            .get(id)
            .map(|r| matches!(r.status, ExecutionStatus::Executing) || r.status.is_terminal())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
