//! # Validation Tier Tests (T0-T3)
//!
//! End-to-end audit scenarios through the public API.
//!
//! ## Tiers
//! - T0: Durable State
//! - T1: Discovery Gate
//! - T2: Assessment Gate
//! - T3: Opportunities Gate and Delivery

use auditgate_core::{
    AuditError, BackendKind, DiscoveryMethod, HealthStatus, Ingestor, IntegrationRecord,
    IntegrationType, MemoryStore, OpportunityRecord, SessionStore, Stage, StageGateManager,
    StorageBackend, ToolPatch,
};
use std::collections::BTreeMap;

fn described(version: &str) -> ToolPatch {
    ToolPatch::discovered_by(DiscoveryMethod::ManualEntry)
        .with_category("Ops")
        .with_users(["Ops"])
        .with_version(version)
}

fn manager_with_tools(names: &[&str]) -> StageGateManager<MemoryStore> {
    let mut manager = StageGateManager::load_or_create(MemoryStore::new(), "audit_tiers", "Acme")
        .expect("create");
    let updates = names
        .iter()
        .map(|n| (n.to_string(), described("1.0")))
        .collect();
    manager.merge_tool_inventory(updates).expect("merge");
    manager
}

fn integration(a: &str, b: &str) -> IntegrationRecord {
    IntegrationRecord::new(a, b, IntegrationType::Api, HealthStatus::Healthy)
}

// =============================================================================
// TIER T0: DURABLE STATE
// =============================================================================

mod t0_durable_state {
    use super::*;
    use tempfile::tempdir;

    /// T0.1: Every backend reloads exactly what was committed.
    #[test]
    fn backends_reload_committed_state() {
        for kind in [BackendKind::File, BackendKind::Redb] {
            let temp = tempdir().expect("temp dir");
            let snapshot = {
                let store = StorageBackend::open(kind, temp.path()).expect("open store");
                let mut manager =
                    StageGateManager::load_or_create(store, "audit_t0", "Acme").expect("create");
                let mut updates = BTreeMap::new();
                updates.insert("Slack".to_string(), described("4.36"));
                manager.merge_tool_inventory(updates).expect("merge");
                manager.advance(Stage::Assessment).expect("advance");
                manager.session().clone()
            };

            let store = StorageBackend::open(kind, temp.path()).expect("reopen store");
            let reopened = StageGateManager::open(store, "audit_t0").expect("open");
            assert_eq!(reopened.session(), &snapshot, "backend {kind:?}");
        }
    }

    /// T0.2: Corrupt persisted data is reported, not replaced.
    #[test]
    fn corrupt_document_is_refused() {
        let temp = tempdir().expect("temp dir");
        std::fs::write(temp.path().join("audit_t0.json"), b"{\"format_version\":1,\"session\":7}")
            .expect("write");
        let store = StorageBackend::open(BackendKind::File, temp.path()).expect("open store");

        let err = StageGateManager::load_or_create(store, "audit_t0", "Acme").expect_err("corrupt");
        assert!(matches!(err, AuditError::CorruptState { .. }));
        let on_disk = std::fs::read(temp.path().join("audit_t0.json")).expect("read");
        assert_eq!(on_disk, b"{\"format_version\":1,\"session\":7}");
    }

    /// T0.3: Session ids cannot escape the data directory.
    #[test]
    fn hostile_session_id_rejected() {
        let temp = tempdir().expect("temp dir");
        let store = StorageBackend::open(BackendKind::File, temp.path()).expect("open store");
        let err = StageGateManager::load_or_create(store, "../../etc/passwd", "x")
            .expect_err("bad id");
        assert!(matches!(err, AuditError::InvalidSessionId(_)));
    }
}

// =============================================================================
// TIER T1: DISCOVERY GATE
// =============================================================================

mod t1_discovery_gate {
    use super::*;

    /// T1.1: Two tools without versions fail the gate naming both; once
    /// versions are supplied the gate passes and the advance commits.
    #[test]
    fn missing_versions_block_then_release() {
        let inventory = "\
Tool Name,Category,Used By,Criticality
Slack,Communication,Ops,High
Zoom,Video Conferencing,Sales,Medium
";
        let mut manager =
            StageGateManager::load_or_create(MemoryStore::new(), "audit_t1", "Acme")
                .expect("create");
        let patches = Ingestor::ingest_str(inventory).expect("ingest");
        manager.merge_tool_inventory(patches).expect("merge");

        let err = manager.advance(Stage::Assessment).expect_err("versions missing");
        let AuditError::GateNotSatisfied { target, reasons } = err else {
            unreachable!("expected a gate failure, got {err}");
        };
        assert_eq!(target, Stage::Assessment);
        assert_eq!(
            reasons,
            vec!["Slack missing: version", "Zoom missing: version"]
        );
        assert_eq!(manager.current_stage(), Stage::Discovery);

        let mut versions = BTreeMap::new();
        versions.insert("slack".to_string(), ToolPatch::default().with_version("4.36"));
        versions.insert("ZOOM".to_string(), ToolPatch::default().with_version("unknown"));
        let outcome = manager.merge_tool_inventory(versions).expect("merge");
        assert_eq!(outcome.augmented.len(), 2);

        assert!(manager.can_advance(Stage::Assessment));
        let session = manager.advance(Stage::Assessment).expect("advance");
        assert_eq!(session.current_stage, Stage::Assessment);
        assert!(session.is_stage_complete(Stage::Discovery));
    }

    /// T1.2: An empty inventory never passes.
    #[test]
    fn empty_inventory_blocks() {
        let manager = manager_with_tools(&[]);
        let report = manager.evaluate_gate(Stage::Assessment);
        assert!(!report.passed);
        assert_eq!(report.reasons, vec!["tool inventory is empty"]);
    }
}

// =============================================================================
// TIER T2: ASSESSMENT GATE
// =============================================================================

mod t2_assessment_gate {
    use super::*;

    /// T2.1: Five tools have ten possible pairs; two pairs (20%) fail, a
    /// third (30%) passes.
    #[test]
    fn coverage_threshold_scenario() {
        let mut manager = manager_with_tools(&["A", "B", "C", "D", "E"]);
        manager.advance(Stage::Assessment).expect("advance");

        manager.append_integration(integration("A", "B")).expect("append");
        manager.append_integration(integration("C", "D")).expect("append");
        // Duplicate and reversed pairs do not add coverage.
        manager.append_integration(integration("B", "A")).expect("append");

        let err = manager.advance(Stage::Opportunities).expect_err("20%");
        assert!(err.to_string().contains("2/10 pairs (20%)"));

        manager.append_integration(integration("A", "E")).expect("append");
        manager.advance(Stage::Opportunities).expect("30%");
        assert!(manager.session().is_stage_complete(Stage::Assessment));
    }

    /// T2.2: A single tool cannot be assessed.
    #[test]
    fn single_tool_blocks() {
        let mut manager = manager_with_tools(&["Solo"]);
        manager.advance(Stage::Assessment).expect("advance");
        manager.append_integration(integration("Solo", "solo")).expect("self link");
        assert!(!manager.can_advance(Stage::Opportunities));
    }

    /// T2.3: Opportunities cannot be recorded before their stage.
    #[test]
    fn opportunity_before_stage_rejected() {
        let mut manager = manager_with_tools(&["A", "B"]);
        manager.advance(Stage::Assessment).expect("advance");
        let err = manager
            .append_opportunity(OpportunityRecord::new("Early", 5))
            .expect_err("wrong stage");
        assert!(matches!(err, AuditError::StageMismatch { .. }));
    }
}

// =============================================================================
// TIER T3: OPPORTUNITIES GATE AND DELIVERY
// =============================================================================

mod t3_delivery {
    use super::*;

    fn at_opportunities() -> StageGateManager<MemoryStore> {
        let mut manager = manager_with_tools(&["Slack", "Zoom"]);
        manager.advance(Stage::Assessment).expect("advance");
        manager.append_integration(integration("Slack", "Zoom")).expect("append");
        manager.advance(Stage::Opportunities).expect("advance");
        manager
    }

    /// T3.1: Three scored opportunities open Delivery, after which the
    /// session is terminal.
    #[test]
    fn full_run_reaches_terminal_stage() {
        let mut manager = at_opportunities();
        for (name, score) in [("Alerts", 14), ("Digest", 9), ("Handoff", 12)] {
            manager
                .append_opportunity(OpportunityRecord::new(name, score).with_tools(["Slack"]))
                .expect("append");
        }
        manager.advance(Stage::Delivery).expect("advance");

        let err = manager.advance(Stage::Delivery).expect_err("terminal");
        assert!(matches!(err, AuditError::TerminalStage(Stage::Delivery)));
        assert!(manager.delivery_readiness().passed);

        let summary = manager.summary();
        assert_eq!(summary.automation.high_priority_count, 2);
        assert!(summary.next_gate.is_none());
    }

    /// T3.2: Unscored opportunities hold the gate.
    #[test]
    fn unscored_opportunity_blocks() {
        let mut manager = at_opportunities();
        for (name, score) in [("Alerts", 14), ("Digest", 0), ("Handoff", 12)] {
            manager
                .append_opportunity(OpportunityRecord::new(name, score))
                .expect("append");
        }
        let first = manager.advance(Stage::Delivery).expect_err("unscored");
        let second = manager.advance(Stage::Delivery).expect_err("unscored");
        assert_eq!(first.to_string(), second.to_string());
        assert!(first.to_string().contains("'Digest' has no priority score"));
        assert_eq!(manager.current_stage(), Stage::Opportunities);
    }

    /// T3.3: Stage completion is never reset by later work.
    #[test]
    fn completion_is_sticky() {
        let mut manager = at_opportunities();
        manager
            .append_opportunity(OpportunityRecord::new("Alerts", 3))
            .expect("append");
        let persisted = manager
            .store()
            .load("audit_tiers")
            .expect("load")
            .expect("present");
        assert!(persisted.is_stage_complete(Stage::Discovery));
        assert!(persisted.is_stage_complete(Stage::Assessment));
        assert!(!persisted.is_stage_complete(Stage::Opportunities));
    }
}
