//! # Stage-Gate Manager
//!
//! The sole mutator of an [`AuditSession`].
//!
//! Every mutation follows the same path:
//! 1. Validate the request against the current state (no changes yet)
//! 2. Apply it to a copy of the session
//! 3. Persist the copy through the [`SessionStore`]
//! 4. Swap the copy in
//!
//! A failure at any step leaves both the in-memory and the persisted session
//! exactly as they were.

use crate::primitives::MAX_TOOL_NAME_LENGTH;
use crate::session::{generate_session_id, validate_session_id};
use crate::storage::{SessionStore, StorageBackend};
use crate::summary::AuditSummary;
use crate::system::{GatePolicy, GateReport, GateValidator, Stage, VersionCatalog};
use crate::types::normalize_tool_name;
use crate::{AuditError, AuditSession, IntegrationRecord, OpportunityRecord, ToolPatch, ToolRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// MERGE OUTCOME
// =============================================================================

/// What one inventory merge did, by tool display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Tools that were not in the inventory before.
    pub added: Vec<String>,
    /// Existing tools that gained at least one field value.
    pub augmented: Vec<String>,
    /// Existing tools the merge left as they were.
    pub unchanged: Vec<String>,
}

impl MergeOutcome {
    /// Whether the merge changed anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.augmented.is_empty()
    }
}

// =============================================================================
// STAGE-GATE MANAGER
// =============================================================================

/// Owns one audit session and its store.
#[derive(Debug)]
pub struct StageGateManager<S: SessionStore = StorageBackend> {
    store: S,
    session: AuditSession,
    validator: GateValidator,
    versions: VersionCatalog,
}

impl<S: SessionStore> StageGateManager<S> {
    /// Load `session_id` from `store`, or create and persist a fresh session
    /// at Discovery if none exists.
    ///
    /// Corrupt persisted data is an error, never silently replaced.
    pub fn load_or_create(
        mut store: S,
        session_id: &str,
        client_name: &str,
    ) -> Result<Self, AuditError> {
        validate_session_id(session_id)?;
        let session = match store.load(session_id)? {
            Some(session) => session,
            None => {
                let session = AuditSession::new(session_id, client_name, None);
                store.save(&session)?;
                session
            }
        };
        Ok(Self::from_parts(store, session))
    }

    /// Create and persist a new session under a generated id.
    pub fn create(
        store: S,
        client_name: &str,
        client_domain: Option<String>,
    ) -> Result<Self, AuditError> {
        Self::create_with_id(store, &generate_session_id(), client_name, client_domain)
    }

    /// Create and persist a new session under `session_id`.
    ///
    /// Fails if a session with that id is already stored.
    pub fn create_with_id(
        mut store: S,
        session_id: &str,
        client_name: &str,
        client_domain: Option<String>,
    ) -> Result<Self, AuditError> {
        validate_session_id(session_id)?;
        if store.load(session_id)?.is_some() {
            return Err(AuditError::InvalidSessionId(format!(
                "{session_id} (already exists)"
            )));
        }
        let session = AuditSession::new(session_id, client_name, client_domain);
        store.save(&session)?;
        Ok(Self::from_parts(store, session))
    }

    /// Load an existing session.
    pub fn open(store: S, session_id: &str) -> Result<Self, AuditError> {
        let session = store
            .load(session_id)?
            .ok_or_else(|| AuditError::SessionNotFound(session_id.to_string()))?;
        Ok(Self::from_parts(store, session))
    }

    fn from_parts(store: S, session: AuditSession) -> Self {
        Self {
            store,
            session,
            validator: GateValidator::new(),
            versions: VersionCatalog::builtin(),
        }
    }

    /// Replace the gate thresholds.
    #[must_use]
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.validator = GateValidator::with_policy(policy);
        self
    }

    /// Replace the latest-version catalog used by [`Self::summary`].
    #[must_use]
    pub fn with_versions(mut self, versions: VersionCatalog) -> Self {
        self.versions = versions;
        self
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> &AuditSession {
        &self.session
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.session.current_stage
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Merge tool patches into the inventory with the non-destructive rule.
    ///
    /// The whole batch is one atomic update: either every patch is applied
    /// and persisted, or none is. Tools are never removed.
    pub fn merge_tool_inventory(
        &mut self,
        updates: BTreeMap<String, ToolPatch>,
    ) -> Result<MergeOutcome, AuditError> {
        for name in updates.keys() {
            let key = normalize_tool_name(name);
            if key.is_empty() {
                return Err(AuditError::InvalidRecord("tool name is empty".to_string()));
            }
            if name.len() > MAX_TOOL_NAME_LENGTH {
                return Err(AuditError::InvalidRecord(format!(
                    "tool name exceeds {MAX_TOOL_NAME_LENGTH} bytes"
                )));
            }
        }

        let mut next = self.session.clone();
        for (name, patch) in &updates {
            let key = normalize_tool_name(name);
            let display = name.split_whitespace().collect::<Vec<_>>().join(" ");
            next.tool_inventory
                .entry(key)
                .and_modify(|record| {
                    record.apply(patch);
                })
                .or_insert_with(|| ToolRecord::from_patch(display, patch));
        }

        let mut outcome = MergeOutcome::default();
        let mut seen = std::collections::BTreeSet::new();
        for name in updates.keys() {
            let key = normalize_tool_name(name);
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(record) = next.tool_inventory.get(&key) else {
                continue;
            };
            match self.session.tool_inventory.get(&key) {
                None => outcome.added.push(record.name.clone()),
                Some(before) if before != record => outcome.augmented.push(record.name.clone()),
                Some(_) => outcome.unchanged.push(record.name.clone()),
            }
        }

        if !outcome.is_noop() {
            self.commit(next)?;
        }
        Ok(outcome)
    }

    /// Append an integration record.
    ///
    /// Only allowed during Assessment; both tools must be inventoried.
    pub fn append_integration(&mut self, record: IntegrationRecord) -> Result<(), AuditError> {
        self.require_stage("integration", Stage::Assessment)?;
        let names = [record.source_tool.clone(), record.target_tool.clone()];
        let missing = self.session.unknown_tools(names.iter());
        if !missing.is_empty() {
            return Err(AuditError::ReferentialIntegrity {
                record: format!(
                    "integration {} -> {}",
                    record.source_tool, record.target_tool
                ),
                missing,
            });
        }

        let mut next = self.session.clone();
        next.integrations.push(record);
        self.commit(next)
    }

    /// Append an opportunity record.
    ///
    /// Only allowed during Opportunities; every referenced tool must be
    /// inventoried.
    pub fn append_opportunity(&mut self, record: OpportunityRecord) -> Result<(), AuditError> {
        self.require_stage("opportunity", Stage::Opportunities)?;
        if record.name.trim().is_empty() {
            return Err(AuditError::InvalidRecord(
                "opportunity name is empty".to_string(),
            ));
        }
        let missing = self.session.unknown_tools(record.tools.iter());
        if !missing.is_empty() {
            return Err(AuditError::ReferentialIntegrity {
                record: format!("opportunity '{}'", record.name),
                missing,
            });
        }

        let mut next = self.session.clone();
        next.opportunities.push(record);
        self.commit(next)
    }

    /// Advance to `target`, the immediate successor of the current stage.
    ///
    /// On failure nothing changes and the same error is returned on repeat.
    pub fn advance(&mut self, target: Stage) -> Result<&AuditSession, AuditError> {
        let from = self.session.current_stage;
        let Some(expected) = from.next() else {
            return Err(AuditError::TerminalStage(from));
        };
        if target != expected {
            return Err(AuditError::InvalidTransition { from, to: target });
        }

        let report = self.validator.evaluate(target, &self.session);
        if !report.passed {
            return Err(AuditError::GateNotSatisfied {
                target,
                reasons: report.reasons,
            });
        }

        let mut next = self.session.clone();
        next.current_stage = target;
        next.stage_completion.insert(from.index(), true);
        self.commit(next)?;
        Ok(&self.session)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether `advance(target)` would succeed right now.
    #[must_use]
    pub fn can_advance(&self, target: Stage) -> bool {
        self.session.current_stage.next() == Some(target) && self.evaluate_gate(target).passed
    }

    /// Evaluate the gate guarding `target` against the current session.
    #[must_use]
    pub fn evaluate_gate(&self, target: Stage) -> GateReport {
        self.validator.evaluate(target, &self.session)
    }

    /// Final client-ready check.
    #[must_use]
    pub fn delivery_readiness(&self) -> GateReport {
        self.validator.delivery_readiness(&self.session)
    }

    /// Roll the session up for reporting.
    #[must_use]
    pub fn summary(&self) -> AuditSummary {
        AuditSummary::from_session(&self.session, &self.validator, &self.versions)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require_stage(&self, record: &'static str, expected: Stage) -> Result<(), AuditError> {
        let current = self.session.current_stage;
        if current == expected {
            Ok(())
        } else {
            Err(AuditError::StageMismatch {
                record,
                expected,
                current,
            })
        }
    }

    /// Persist `next`, then make it the current session.
    fn commit(&mut self, mut next: AuditSession) -> Result<(), AuditError> {
        next.touch();
        self.store.save(&next)?;
        self.session = next;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{DiscoveryMethod, HealthStatus, IntegrationType};

    /// Store whose saves can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_saves: bool,
    }

    impl SessionStore for FlakyStore {
        fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError> {
            self.inner.load(session_id)
        }

        fn save(&mut self, session: &AuditSession) -> Result<(), AuditError> {
            if self.fail_saves {
                return Err(AuditError::Storage("disk full".to_string()));
            }
            self.inner.save(session)
        }

        fn list(&self) -> Result<Vec<String>, AuditError> {
            self.inner.list()
        }
    }

    fn full_patch(version: &str) -> ToolPatch {
        ToolPatch::discovered_by(DiscoveryMethod::ManualInventory)
            .with_category("Ops")
            .with_users(["Ops"])
            .with_version(version)
    }

    fn manager_with(names: &[&str]) -> StageGateManager<MemoryStore> {
        let mut manager =
            StageGateManager::load_or_create(MemoryStore::new(), "audit_mgr", "Acme")
                .expect("create");
        let updates = names
            .iter()
            .map(|n| (n.to_string(), full_patch("1.0")))
            .collect();
        manager.merge_tool_inventory(updates).expect("merge");
        manager
    }

    #[test]
    fn load_or_create_persists_fresh_session() {
        let manager = StageGateManager::load_or_create(MemoryStore::new(), "audit_new", "Acme")
            .expect("create");
        assert_eq!(manager.current_stage(), Stage::Discovery);
        assert!(manager.store().load("audit_new").expect("load").is_some());
    }

    #[test]
    fn load_or_create_reuses_existing() {
        let manager = manager_with(&["Slack"]);
        let store = manager.store().clone();
        let reopened =
            StageGateManager::load_or_create(store, "audit_mgr", "Other").expect("reopen");
        assert_eq!(reopened.session().client_name, "Acme");
        assert!(reopened.session().tool("slack").is_some());
    }

    #[test]
    fn load_or_create_refuses_corrupt_data() {
        let mut store = MemoryStore::new();
        store.insert_raw("audit_bad", b"not json".to_vec());
        let err = StageGateManager::load_or_create(store, "audit_bad", "Acme")
            .expect_err("corrupt");
        assert!(matches!(err, AuditError::CorruptState { .. }));
    }

    #[test]
    fn open_unknown_session() {
        let err = StageGateManager::open(MemoryStore::new(), "audit_none").expect_err("missing");
        assert!(matches!(err, AuditError::SessionNotFound(_)));
    }

    #[test]
    fn create_generates_id() {
        let manager = StageGateManager::create(MemoryStore::new(), "Acme", Some("acme.com".into()))
            .expect("create");
        assert!(manager.session_id().starts_with("audit_"));
        assert_eq!(manager.session().client_domain.as_deref(), Some("acme.com"));
    }

    #[test]
    fn create_with_id_refuses_existing_session() {
        let manager = manager_with(&["Slack"]);
        let store = manager.store().clone();
        let err = StageGateManager::create_with_id(store, "audit_mgr", "Other", None)
            .expect_err("duplicate");
        assert!(matches!(err, AuditError::InvalidSessionId(_)));
    }

    #[test]
    fn merge_reports_outcome() {
        let mut manager = manager_with(&["Slack"]);
        let mut updates = BTreeMap::new();
        updates.insert("slack".to_string(), full_patch("9.9"));
        updates.insert("Zoom".to_string(), full_patch("5.0"));
        updates.insert(
            "SLACK".to_string(),
            ToolPatch::default().with_provider("slack.com"),
        );
        let outcome = manager.merge_tool_inventory(updates).expect("merge");
        assert_eq!(outcome.added, vec!["Zoom".to_string()]);
        assert_eq!(outcome.augmented, vec!["Slack".to_string()]);
        assert_eq!(manager.session().tool("slack").map(|t| t.version.as_str()), Some("1.0"));
    }

    #[test]
    fn noop_merge_does_not_persist() {
        let mut manager = manager_with(&["Slack"]);
        let before = manager.session().updated_at;
        let mut updates = BTreeMap::new();
        updates.insert("Slack".to_string(), full_patch("2.0"));
        let outcome = manager.merge_tool_inventory(updates).expect("merge");
        assert!(outcome.is_noop());
        assert_eq!(outcome.unchanged, vec!["Slack".to_string()]);
        assert_eq!(manager.session().updated_at, before);
    }

    #[test]
    fn merge_rejects_blank_names_before_mutation() {
        let mut manager = manager_with(&["Slack"]);
        let mut updates = BTreeMap::new();
        updates.insert("Zoom".to_string(), full_patch("1"));
        updates.insert("   ".to_string(), full_patch("1"));
        assert!(manager.merge_tool_inventory(updates).is_err());
        assert!(manager.session().tool("zoom").is_none());
    }

    #[test]
    fn failed_persist_leaves_memory_unchanged() {
        let store = FlakyStore::default();
        let mut manager =
            StageGateManager::load_or_create(store, "audit_flaky", "Acme").expect("create");
        manager.store.fail_saves = true;

        let mut updates = BTreeMap::new();
        updates.insert("Slack".to_string(), full_patch("1"));
        let err = manager.merge_tool_inventory(updates).expect_err("save fails");
        assert!(matches!(err, AuditError::Storage(_)));
        assert!(manager.session().tool_inventory.is_empty());

        let persisted = manager.store().load("audit_flaky").expect("load").expect("present");
        assert!(persisted.tool_inventory.is_empty());
    }

    #[test]
    fn integrations_only_during_assessment() {
        let mut manager = manager_with(&["Slack", "Zoom"]);
        let record =
            IntegrationRecord::new("Slack", "Zoom", IntegrationType::Api, HealthStatus::Healthy);
        let err = manager
            .append_integration(record.clone())
            .expect_err("wrong stage");
        assert!(matches!(
            err,
            AuditError::StageMismatch {
                expected: Stage::Assessment,
                current: Stage::Discovery,
                ..
            }
        ));

        manager.advance(Stage::Assessment).expect("advance");
        manager.append_integration(record).expect("append");
        assert_eq!(manager.session().integrations.len(), 1);
    }

    #[test]
    fn integration_with_unknown_tool_rejected() {
        let mut manager = manager_with(&["Slack", "Zoom"]);
        manager.advance(Stage::Assessment).expect("advance");
        let err = manager
            .append_integration(IntegrationRecord::new(
                "Slack",
                "Ghost",
                IntegrationType::Webhook,
                HealthStatus::Unknown,
            ))
            .expect_err("unknown tool");
        assert!(matches!(
            err,
            AuditError::ReferentialIntegrity { ref missing, .. } if missing == &["Ghost".to_string()]
        ));
        assert!(manager.session().integrations.is_empty());
    }

    #[test]
    fn advance_rejects_skips_and_terminal() {
        let mut manager = manager_with(&["Slack"]);
        let err = manager.advance(Stage::Opportunities).expect_err("skip");
        assert!(matches!(
            err,
            AuditError::InvalidTransition {
                from: Stage::Discovery,
                to: Stage::Opportunities
            }
        ));
        assert!(!manager.can_advance(Stage::Opportunities));
        assert!(manager.can_advance(Stage::Assessment));

        manager.session.current_stage = Stage::Delivery;
        let err = manager.advance(Stage::Delivery).expect_err("terminal");
        assert!(matches!(err, AuditError::TerminalStage(Stage::Delivery)));
    }

    #[test]
    fn advance_marks_completion_and_persists() {
        let mut manager = manager_with(&["Slack"]);
        manager.advance(Stage::Assessment).expect("advance");
        assert!(manager.session().is_stage_complete(Stage::Discovery));
        assert!(!manager.session().is_stage_complete(Stage::Assessment));

        let persisted = manager.store().load("audit_mgr").expect("load").expect("present");
        assert_eq!(persisted.current_stage, Stage::Assessment);
        assert_eq!(&persisted, manager.session());
    }

    #[test]
    fn opportunities_need_inventoried_tools() {
        let mut manager = manager_with(&["Slack", "Zoom"]);
        manager.advance(Stage::Assessment).expect("advance");
        manager
            .append_integration(IntegrationRecord::new(
                "Slack",
                "Zoom",
                IntegrationType::Api,
                HealthStatus::Healthy,
            ))
            .expect("append");
        manager.advance(Stage::Opportunities).expect("advance");

        let err = manager
            .append_opportunity(OpportunityRecord::new("Sync", 10).with_tools(["Slack", "Jira"]))
            .expect_err("unknown tool");
        assert!(matches!(err, AuditError::ReferentialIntegrity { .. }));

        manager
            .append_opportunity(OpportunityRecord::new("Sync", 10).with_tools(["slack", "ZOOM"]))
            .expect("append");
        assert_eq!(manager.session().opportunities.len(), 1);
    }
}
