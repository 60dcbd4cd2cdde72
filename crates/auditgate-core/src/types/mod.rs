//! # Core Type Definitions
//!
//! This module contains the record types an audit session is built from:
//! - Tool inventory records and the partial patches applied to them
//!   (`ToolRecord`, `ToolPatch`, `DiscoveryMethod`, `ApiStatus`)
//! - Integration and opportunity records
//! - Error types (`AuditError`)
//!
//! ## Ordering Guarantees
//!
//! Collections use `BTreeMap`/`BTreeSet` so that iteration order, gate
//! reasons and serialized documents are deterministic.

mod records;

pub use records::{
    ApiStatus, DiscoveryMethod, HealthStatus, IntegrationRecord, IntegrationType,
    OpportunityRecord, ToolPatch, ToolRecord,
};

use crate::system::Stage;
use thiserror::Error;

// =============================================================================
// TOOL NAME NORMALIZATION
// =============================================================================

/// Normalize a tool name into its inventory key.
///
/// Keys are case-insensitive and whitespace-insensitive: surrounding
/// whitespace is trimmed and internal runs of whitespace collapse to a single
/// space, so `"  Microsoft   365 "` and `"microsoft 365"` name the same tool.
#[must_use]
pub fn normalize_tool_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the AuditGate core.
///
/// - Structural and integrity errors are raised before any mutation, so the
///   session (in memory and on disk) is unchanged when one is returned
/// - Gate failures carry the specific unmet criteria
/// - Per-probe network failures are never represented here; they are
///   recorded as data on the tool record
#[derive(Debug, Error)]
pub enum AuditError {
    /// Persisted data could not be parsed into the session schema.
    #[error("Corrupt state for session '{session_id}': {reason}")]
    CorruptState { session_id: String, reason: String },

    /// A record references tools that are not in the inventory.
    #[error("{record} references unknown tools: {}", .missing.join(", "))]
    ReferentialIntegrity { record: String, missing: Vec<String> },

    /// The gate guarding `target` is not satisfied.
    #[error("Gate for {target} not satisfied: {}", .reasons.join("; "))]
    GateNotSatisfied { target: Stage, reasons: Vec<String> },

    /// The session is already at the terminal stage.
    #[error("Session is at terminal stage {0}; no further advance is possible")]
    TerminalStage(Stage),

    /// The requested transition is not the single forward step.
    #[error("Invalid transition {from} -> {to}: stages advance one step at a time")]
    InvalidTransition { from: Stage, to: Stage },

    /// A record was produced outside the stage that owns it.
    #[error("{record} records can only be added during {expected} (current stage: {current})")]
    StageMismatch {
        record: &'static str,
        expected: Stage,
        current: Stage,
    },

    /// No persisted session exists under the given id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session id is empty, too long or contains unsupported characters.
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// The tabular inventory input could not be used.
    #[error("Invalid inventory: {0}")]
    InvalidInventory(String),

    /// A record or argument failed validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A storage backend failed (I/O, database).
    #[error("Storage error: {0}")]
    Storage(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize_tool_name("  Microsoft   365 "), "microsoft 365");
        assert_eq!(normalize_tool_name("SLACK"), "slack");
        assert_eq!(normalize_tool_name("Wealth\tBox"), "wealth box");
    }

    #[test]
    fn normalize_blank_is_empty() {
        assert_eq!(normalize_tool_name("   "), "");
    }

    #[test]
    fn gate_error_lists_reasons() {
        let err = AuditError::GateNotSatisfied {
            target: Stage::Assessment,
            reasons: vec!["a missing: version".into(), "b missing: version".into()],
        };
        let text = err.to_string();
        assert!(text.contains("Assessment"));
        assert!(text.contains("a missing: version; b missing: version"));
    }
}
