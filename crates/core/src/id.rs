// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID newtypes and identifier validation.
//!
//! Ids are minted by the assistant and the relay; this crate only wraps
//! and validates them. Session ids cross process boundaries, so the
//! validation helpers here are the single source of truth for what the
//! daemon's control surface and the hooks accept.

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`,
/// `From<&str>`, `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>`
/// implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Assistant-assigned session identifier (the external id).
    pub struct SessionId;
}

define_id! {
    /// Identifier of a remote approval.
    pub struct ApprovalId;
}

define_id! {
    /// Identifier of an inbox message routed through the relay.
    pub struct MessageId;
}

define_id! {
    /// Identifier of a stored execution result awaiting delivery.
    pub struct ResultId;
}

/// Maximum accepted length for session and approval ids.
pub const MAX_ID_LEN: usize = 256;

/// Maximum accepted length for tool names.
pub const MAX_TOOL_NAME_LEN: usize = 100;

/// Whether `id` is acceptable as a session or approval id: non-empty,
/// at most 256 chars, alphanumerics plus `_`, `-`, `@`, `.`.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@' | '.'))
}

/// Whether `name` is acceptable as a tool name: non-empty, at most 100
/// chars, alphanumerics plus underscore.
pub fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `id` has the canonical UUID shape (8-4-4-4-12 lowercase or
/// uppercase hex). Hooks warn when the assistant hands them anything else.
pub fn is_uuid_like(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    if groups.len() != 5 {
        return false;
    }
    const LENS: [usize; 5] = [8, 4, 4, 4, 12];
    groups
        .iter()
        .zip(LENS)
        .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
