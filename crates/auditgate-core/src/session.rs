//! # Session Module
//!
//! The `AuditSession` aggregate: one per client engagement.
//!
//! An `AuditSession` is plain data. It is only ever mutated through the
//! [`StageGateManager`](crate::StageGateManager), which validates, persists and
//! then swaps in each new state.
//!
//! ## Stage Completion
//!
//! `stage_completion` is keyed by one-based stage index. Advancing into a stage
//! marks the stage being left as complete, so a session at stage `k` has
//! exactly the indices `1..k` marked.

use crate::primitives::{MAX_SESSION_ID_LENGTH, MAX_TOOL_NAME_LENGTH, SESSION_ID_PREFIX};
use crate::system::Stage;
use crate::types::{AuditError, IntegrationRecord, OpportunityRecord, ToolRecord, normalize_tool_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SESSION IDS
// =============================================================================

/// Check that a session id is usable as a storage key and file stem.
pub fn validate_session_id(id: &str) -> Result<(), AuditError> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(AuditError::InvalidSessionId(id.to_string()))
    }
}

/// Generate a fresh session id of the form `audit_<8 hex chars>`.
#[must_use]
pub fn generate_session_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("{SESSION_ID_PREFIX}{}", &simple[..8])
}

// =============================================================================
// AUDIT SESSION
// =============================================================================

/// Root aggregate for one technology audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSession {
    pub session_id: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_domain: Option<String>,
    pub current_stage: Stage,
    #[serde(default)]
    pub stage_completion: BTreeMap<u8, bool>,
    /// Normalized tool name -> record.
    #[serde(default)]
    pub tool_inventory: BTreeMap<String, ToolRecord>,
    #[serde(default)]
    pub integrations: Vec<IntegrationRecord>,
    #[serde(default)]
    pub opportunities: Vec<OpportunityRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditSession {
    /// Create a fresh session at the Discovery stage.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        client_name: impl Into<String>,
        client_domain: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            client_name: client_name.into(),
            client_domain: client_domain
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty()),
            current_stage: Stage::Discovery,
            stage_completion: Stage::ALL.iter().map(|s| (s.index(), false)).collect(),
            tool_inventory: BTreeMap::new(),
            integrations: Vec::new(),
            opportunities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `stage` has been completed (the session has moved past it).
    #[must_use]
    pub fn is_stage_complete(&self, stage: Stage) -> bool {
        self.stage_completion
            .get(&stage.index())
            .copied()
            .unwrap_or(false)
    }

    /// Look a tool up by any spelling of its name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolRecord> {
        self.tool_inventory.get(&normalize_tool_name(name))
    }

    /// Tool names from `names` that are not in the inventory, in input order.
    #[must_use]
    pub fn unknown_tools<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            if self.tool(name).is_none() && !missing.contains(name) {
                missing.push(name.clone());
            }
        }
        missing
    }

    /// Refresh `updated_at`, keeping it monotonic.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    /// Check structural invariants of a loaded session.
    ///
    /// Returns `CorruptState` naming the first violation.
    pub fn validate(&self) -> Result<(), AuditError> {
        let corrupt = |reason: String| AuditError::CorruptState {
            session_id: self.session_id.clone(),
            reason,
        };

        validate_session_id(&self.session_id)
            .map_err(|_| corrupt("session id is malformed".to_string()))?;

        for key in self.stage_completion.keys() {
            if Stage::from_index(*key).is_none() {
                return Err(corrupt(format!("stage_completion has unknown index {key}")));
            }
        }
        for stage in Stage::ALL {
            let expected = stage < self.current_stage;
            if self.is_stage_complete(stage) != expected {
                return Err(corrupt(format!(
                    "stage {} completion is inconsistent with current stage {}",
                    stage.index(),
                    self.current_stage
                )));
            }
        }

        for (key, record) in &self.tool_inventory {
            if key.is_empty() || record.name.len() > MAX_TOOL_NAME_LENGTH {
                return Err(corrupt(format!("invalid tool name '{}'", record.name)));
            }
            if *key != normalize_tool_name(&record.name) {
                return Err(corrupt(format!(
                    "inventory key '{key}' does not match tool name '{}'",
                    record.name
                )));
            }
        }

        for integration in &self.integrations {
            let names = [
                integration.source_tool.clone(),
                integration.target_tool.clone(),
            ];
            let missing = self.unknown_tools(names.iter());
            if !missing.is_empty() {
                return Err(corrupt(format!(
                    "integration references unknown tools: {}",
                    missing.join(", ")
                )));
            }
        }
        for opportunity in &self.opportunities {
            let missing = self.unknown_tools(opportunity.tools.iter());
            if !missing.is_empty() {
                return Err(corrupt(format!(
                    "opportunity '{}' references unknown tools: {}",
                    opportunity.name,
                    missing.join(", ")
                )));
            }
        }

        if self.updated_at < self.created_at {
            return Err(corrupt("updated_at precedes created_at".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
