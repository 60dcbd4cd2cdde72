//! # Audit Summary
//!
//! Read-only roll-up of a session for reporting collaborators.

use crate::primitives::HIGH_PRIORITY_SCORE;
use crate::system::{
    CoverageStats, GateReport, GateValidator, Stage, VersionCatalog, VersionCheck, VersionStatus,
};
use crate::{AuditSession, HealthStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used for tools with a blank classification.
const UNCLASSIFIED: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub session_id: String,
    pub client_name: String,
    pub client_domain: Option<String>,
    pub current_stage: Stage,
    pub stage_completion: BTreeMap<u8, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_tools: usize,
    /// Category -> tool display names.
    pub tools_by_category: BTreeMap<String, Vec<String>>,
    /// Criticality -> tool display names.
    pub tools_by_criticality: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub total_integrations: usize,
    pub health: BTreeMap<HealthStatus, usize>,
    pub coverage: CoverageStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSummary {
    pub total_opportunities: usize,
    pub high_priority_count: usize,
    pub unscored_count: usize,
}

/// How the inventory was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    /// Discovery method tag -> number of tools first found that way.
    pub by_method: BTreeMap<String, usize>,
    /// API status -> number of probed tools.
    pub api_status: BTreeMap<String, usize>,
}

/// Recorded versions against the latest known releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub current_count: usize,
    /// Tools whose version could not be compared.
    pub unknown_count: usize,
    /// Tools behind the latest release, by display name.
    pub outdated: Vec<VersionCheck>,
}

/// Full audit roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub audit_info: AuditInfo,
    pub inventory: InventorySummary,
    pub integrations: IntegrationSummary,
    pub automation: AutomationSummary,
    pub discovery: DiscoverySummary,
    pub versions: VersionSummary,
    /// Gate guarding the next stage, if the session is not terminal.
    pub next_gate: Option<GateReport>,
    pub delivery_readiness: GateReport,
}

impl AuditSummary {
    /// Summarize `session` using `validator`'s thresholds and `catalog`'s
    /// latest versions.
    #[must_use]
    pub fn from_session(
        session: &AuditSession,
        validator: &GateValidator,
        catalog: &VersionCatalog,
    ) -> Self {
        let mut tools_by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tools_by_criticality: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_method: BTreeMap<String, usize> = BTreeMap::new();
        let mut api_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut versions = VersionSummary {
            current_count: 0,
            unknown_count: 0,
            outdated: Vec::new(),
        };

        for record in session.tool_inventory.values() {
            tools_by_category
                .entry(label(&record.category))
                .or_default()
                .push(record.name.clone());
            tools_by_criticality
                .entry(label(&record.criticality))
                .or_default()
                .push(record.name.clone());
            let method = record
                .discovery_method
                .map_or(UNCLASSIFIED.to_lowercase(), |m| m.as_str().to_string());
            *by_method.entry(method).or_default() += 1;
            if let Some(status) = record.api_status {
                *api_status.entry(status.as_str().to_string()).or_default() += 1;
            }
            let check = catalog.check(record);
            match check.status {
                VersionStatus::Current | VersionStatus::Ahead => versions.current_count += 1,
                VersionStatus::Outdated => versions.outdated.push(check),
                VersionStatus::Unknown => versions.unknown_count += 1,
            }
        }

        let mut health: BTreeMap<HealthStatus, usize> = BTreeMap::new();
        for integration in &session.integrations {
            *health.entry(integration.health_status).or_default() += 1;
        }

        let high_priority_count = session
            .opportunities
            .iter()
            .filter(|o| o.priority_score >= HIGH_PRIORITY_SCORE)
            .count();
        let unscored_count = session
            .opportunities
            .iter()
            .filter(|o| !o.is_scored())
            .count();

        Self {
            audit_info: AuditInfo {
                session_id: session.session_id.clone(),
                client_name: session.client_name.clone(),
                client_domain: session.client_domain.clone(),
                current_stage: session.current_stage,
                stage_completion: session.stage_completion.clone(),
            },
            inventory: InventorySummary {
                total_tools: session.tool_inventory.len(),
                tools_by_category,
                tools_by_criticality,
            },
            integrations: IntegrationSummary {
                total_integrations: session.integrations.len(),
                health,
                coverage: CoverageStats::of(session),
            },
            automation: AutomationSummary {
                total_opportunities: session.opportunities.len(),
                high_priority_count,
                unscored_count,
            },
            discovery: DiscoverySummary {
                by_method,
                api_status,
            },
            versions,
            next_gate: session
                .current_stage
                .next()
                .map(|target| validator.evaluate(target, session)),
            delivery_readiness: validator.delivery_readiness(session),
        }
    }
}

fn label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNCLASSIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}
