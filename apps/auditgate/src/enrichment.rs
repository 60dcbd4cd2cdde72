//! Wiring between the discovery engine and the stage-gate manager.
//!
//! Probing reads a snapshot of the session and runs without access to the
//! manager; the manager only sees the finished report as one merge.

use crate::config::AppConfig;
use crate::error::AppError;
use auditgate_core::{AuditSession, MergeOutcome};
use auditgate_discovery::{DiscoveryEngine, DiscoveryReport, DiscoveryStats};
use serde::{Deserialize, Serialize};

/// What a discovery run should probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTargets {
    /// Display names of the inventoried tools.
    pub tool_names: Vec<String>,
    pub domain: Option<String>,
}

impl DiscoveryTargets {
    /// Targets for `session`. A non-blank `domain` replaces the session's.
    #[must_use]
    pub fn of(session: &AuditSession, domain: Option<&str>) -> Self {
        let domain = domain
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .or_else(|| session.client_domain.clone());
        Self {
            tool_names: session
                .tool_inventory
                .values()
                .map(|tool| tool.name.clone())
                .collect(),
            domain,
        }
    }

    /// Run both probe families against these targets.
    pub async fn probe(&self, engine: &DiscoveryEngine) -> Result<DiscoveryReport, AppError> {
        Ok(engine.enrich(&self.tool_names, self.domain.as_deref()).await?)
    }
}

/// Result of one discovery run merged into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub merge: MergeOutcome,
    pub stats: DiscoveryStats,
}

/// Build the discovery engine described by `config`.
pub fn build_engine(config: &AppConfig) -> Result<DiscoveryEngine, AppError> {
    Ok(DiscoveryEngine::new(
        config.discovery.engine_config(),
        config.discovery.registry(),
    )?)
}
