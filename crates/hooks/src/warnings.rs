// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing warnings hooks may emit on stderr.
//!
//! These are the only deliberate stderr writes in the hook family: a
//! malformed session id, and credentials that changed after the session
//! marker was written (the user must restart the assistant to pick the
//! new credentials up). Both still exit zero.

use std::time::SystemTime;

use tp_core::{is_uuid_like, StatePaths};

/// Warnings detected at hook start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings {
    pub malformed_session_id: bool,
    pub credentials_changed: bool,
}

impl Warnings {
    /// Check both warning conditions.
    pub fn detect(session_id: &str, paths: &StatePaths) -> Self {
        Self {
            malformed_session_id: !session_id.is_empty() && !is_uuid_like(session_id),
            credentials_changed: credentials_newer_than_marker(paths),
        }
    }

    /// Emit the applicable warnings on stderr.
    pub fn emit(&self) {
        if self.malformed_session_id {
            eprintln!(
                "warn: session id does not look like a UUID; remote execution may misbehave"
            );
        }
        if self.credentials_changed {
            eprintln!(
                "warn: credentials changed since this session started; restart the assistant to use them"
            );
        }
    }
}

/// Whether `credentials.json` was modified after the session marker.
fn credentials_newer_than_marker(paths: &StatePaths) -> bool {
    let Some(marker) = mtime(&paths.session_marker()) else {
        return false;
    };
    let Some(credentials) = mtime(&paths.credentials_file()) else {
        return false;
    };
    credentials > marker
}

fn mtime(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
#[path = "warnings_tests.rs"]
mod tests;
