//! # Audit Primitives
//!
//! Hardcoded runtime constants for the AuditGate core.
//!
//! Gate thresholds here are defaults only; [`crate::GatePolicy`] carries the
//! values actually used for evaluation.

/// Current persisted session document format version.
///
/// Increment this when making breaking changes to the session schema.
pub const FORMAT_VERSION: u8 = 1;

/// Default minimum share (percent) of possible tool pairs that must have a
/// recorded integration before the Assessment stage is complete.
pub const DEFAULT_COVERAGE_PERCENT: u32 = 30;

/// Default minimum number of opportunities before the Opportunities stage is
/// complete.
pub const DEFAULT_MIN_OPPORTUNITIES: usize = 3;

/// Priority score at or above which an opportunity counts as high priority
/// in audit summaries.
pub const HIGH_PRIORITY_SCORE: i64 = 12;

/// Placeholder version string for tools whose version could not be determined.
///
/// Counts as present for the Discovery gate but as empty for merging, so a
/// later probe that finds a concrete version may fill it.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Users placeholder for tools found by automated discovery.
pub const AUTO_DETECTED_USERS: &str = "auto-detected";

/// Criticality placeholder for tools found by automated discovery.
pub const UNKNOWN_CRITICALITY: &str = "Unknown";

/// Prefix for generated session identifiers.
pub const SESSION_ID_PREFIX: &str = "audit_";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a session identifier.
///
/// Session ids name files on disk, so they are short and restricted to
/// `[A-Za-z0-9_-]`.
pub const MAX_SESSION_ID_LENGTH: usize = 128;

/// Maximum length of a tool name.
pub const MAX_TOOL_NAME_LENGTH: usize = 256;

/// Maximum number of rows accepted from one inventory file.
pub const MAX_INVENTORY_ROWS: usize = 10_000;

/// Maximum size of a persisted session document (64 MiB).
///
/// Checked before parsing so a corrupted or hostile file cannot force a huge
/// allocation.
pub const MAX_SESSION_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        assert_eq!(DEFAULT_COVERAGE_PERCENT, 30);
        assert_eq!(DEFAULT_MIN_OPPORTUNITIES, 3);
    }

    #[test]
    fn session_prefix_is_a_valid_id_fragment() {
        assert!(
            SESSION_ID_PREFIX
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }
}
