//! # Persistence Format
//!
//! JSON document codec for audit sessions.
//!
//! Format: `{"format_version": 1, "session": {...}}`.
//! File and database I/O live in [`crate::storage`]; this module is a pure
//! transformation between bytes and [`AuditSession`].
//!
//! ## Validation
//!
//! Decoding checks, in order and before building the session:
//! - Document size (`MAX_SESSION_DOCUMENT_SIZE`)
//! - `format_version`
//! - Session schema, then structural invariants ([`AuditSession::validate`])
//!
//! Any failure is `CorruptState`. Corrupt data is never silently replaced.

use crate::primitives::{FORMAT_VERSION, MAX_SESSION_DOCUMENT_SIZE};
use crate::{AuditError, AuditSession};
use serde::{Deserialize, Serialize};

// =============================================================================
// DOCUMENT ENVELOPE
// =============================================================================

#[derive(Serialize)]
struct DocumentRef<'a> {
    format_version: u8,
    session: &'a AuditSession,
}

#[derive(Deserialize)]
struct RawDocument {
    format_version: u8,
    session: serde_json::Value,
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a session to its persisted document bytes.
pub fn session_to_bytes(session: &AuditSession) -> Result<Vec<u8>, AuditError> {
    let document = DocumentRef {
        format_version: FORMAT_VERSION,
        session,
    };
    serde_json::to_vec_pretty(&document)
        .map_err(|e| AuditError::Storage(format!("failed to encode session: {e}")))
}

/// Deserialize and validate a persisted document.
///
/// `expected_id` is the key the document was stored under; a document whose
/// embedded id differs is treated as corrupt.
pub fn session_from_bytes(expected_id: &str, bytes: &[u8]) -> Result<AuditSession, AuditError> {
    let corrupt = |reason: String| AuditError::CorruptState {
        session_id: expected_id.to_string(),
        reason,
    };

    if bytes.len() > MAX_SESSION_DOCUMENT_SIZE {
        return Err(corrupt(format!(
            "document size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SESSION_DOCUMENT_SIZE
        )));
    }

    let raw: RawDocument = serde_json::from_slice(bytes)
        .map_err(|e| corrupt(format!("unreadable document: {e}")))?;
    if raw.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {} (expected {})",
            raw.format_version, FORMAT_VERSION
        )));
    }

    let session: AuditSession = serde_json::from_value(raw.session)
        .map_err(|e| corrupt(format!("session does not match schema: {e}")))?;
    if session.session_id != expected_id {
        return Err(corrupt(format!(
            "document belongs to session '{}'",
            session.session_id
        )));
    }
    session.validate()?;
    Ok(session)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscoveryMethod, ToolPatch, ToolRecord};

    fn sample() -> AuditSession {
        let mut session = AuditSession::new("audit_codec", "Acme", Some("acme.com".into()));
        session.tool_inventory.insert(
            "slack".into(),
            ToolRecord::from_patch(
                "Slack",
                &ToolPatch::discovered_by(DiscoveryMethod::ManualInventory)
                    .with_category("Communication")
                    .with_users(["Ops", "Sales"])
                    .with_version("4.36"),
            ),
        );
        session
    }

    #[test]
    fn document_roundtrip_is_lossless() {
        let session = sample();
        let bytes = session_to_bytes(&session).expect("encode");
        let restored = session_from_bytes("audit_codec", &bytes).expect("decode");
        assert_eq!(session, restored);

        let again = session_to_bytes(&restored).expect("re-encode");
        assert_eq!(bytes, again, "save -> load -> save must produce identical bytes");
    }

    #[test]
    fn envelope_carries_format_version() {
        let bytes = session_to_bytes(&sample()).expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["session"]["current_stage"], "Discovery");
        assert_eq!(value["session"]["stage_completion"]["1"], false);
    }

    #[test]
    fn unknown_version_rejected() {
        let bytes = session_to_bytes(&sample()).expect("encode");
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        value["format_version"] = serde_json::json!(9);
        let tampered = serde_json::to_vec(&value).expect("json");
        let err = session_from_bytes("audit_codec", &tampered).expect_err("version 9");
        assert!(err.to_string().contains("unsupported format version 9"));
    }

    #[test]
    fn garbage_is_corrupt_state() {
        let err = session_from_bytes("audit_codec", b"{not json").expect_err("garbage");
        assert!(matches!(err, AuditError::CorruptState { .. }));
    }

    #[test]
    fn foreign_session_rejected() {
        let bytes = session_to_bytes(&sample()).expect("encode");
        let err = session_from_bytes("audit_other", &bytes).expect_err("wrong id");
        assert!(matches!(err, AuditError::CorruptState { .. }));
    }
}
