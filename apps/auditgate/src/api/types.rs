//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use auditgate_core::{
    CoverageStats, DiscoveryMethod, GateReport, HealthStatus, IntegrationRecord, IntegrationType,
    Stage, ToolPatch,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Unmet gate criteria, for gate failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

// =============================================================================
// GATES
// =============================================================================

/// Gate evaluation plus whether an advance would be accepted now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    #[serde(flatten)]
    pub report: GateReport,
    pub can_advance: bool,
}

/// Stage advance request. Without `target`, the next stage is assumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvanceRequest {
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub from: Stage,
    pub current_stage: Stage,
    pub stage_completion: BTreeMap<u8, bool>,
}

// =============================================================================
// TOOLS
// =============================================================================

/// Tool name -> partial record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsRequest {
    pub tools: BTreeMap<String, ToolPatch>,
}

impl ToolsRequest {
    /// Patches to merge; untagged patches count as manual entry.
    #[must_use]
    pub fn into_patches(self) -> BTreeMap<String, ToolPatch> {
        self.tools
            .into_iter()
            .map(|(name, mut patch)| {
                if patch.discovery_method.is_none() {
                    patch.discovery_method = Some(DiscoveryMethod::ManualEntry);
                }
                (name, patch)
            })
            .collect()
    }
}

// =============================================================================
// INTEGRATIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub source_tool: String,
    pub target_tool: String,
    #[serde(default = "unknown_type")]
    pub integration_type: IntegrationType,
    #[serde(default = "unknown_health")]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn unknown_type() -> IntegrationType {
    IntegrationType::Unknown
}

fn unknown_health() -> HealthStatus {
    HealthStatus::Unknown
}

impl From<IntegrationRequest> for IntegrationRecord {
    fn from(request: IntegrationRequest) -> Self {
        Self {
            issues: request.issues,
            notes: request.notes,
            ..IntegrationRecord::new(
                request.source_tool.trim(),
                request.target_tool.trim(),
                request.integration_type,
                request.health_status,
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationResponse {
    pub integration: IntegrationRecord,
    pub coverage: CoverageStats,
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// Discovery request. `domain` replaces the session's client domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverRequest {
    pub domain: Option<String>,
}
