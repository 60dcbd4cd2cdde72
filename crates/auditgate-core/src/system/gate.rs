//! # Gate Validator
//!
//! Pure completeness checks guarding each stage transition.
//!
//! Every check reads a session snapshot and returns a [`GateReport`]; nothing
//! here mutates state. Ratio checks use integer arithmetic only.

use super::Stage;
use crate::primitives::{DEFAULT_COVERAGE_PERCENT, DEFAULT_MIN_OPPORTUNITIES};
use crate::session::AuditSession;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// GATE POLICY
// =============================================================================

/// Thresholds used by the gate validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    /// Minimum share (percent) of possible tool pairs with an integration.
    pub coverage_percent: u32,
    /// Minimum number of scored opportunities.
    pub min_opportunities: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl GatePolicy {
    /// Create a policy with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coverage_percent: DEFAULT_COVERAGE_PERCENT,
            min_opportunities: DEFAULT_MIN_OPPORTUNITIES,
        }
    }

    /// Create a policy with custom thresholds, clamped by [`Self::strict`].
    #[must_use]
    pub fn with_thresholds(coverage_percent: u32, min_opportunities: usize) -> Self {
        Self {
            coverage_percent,
            min_opportunities,
        }
        .strict()
    }

    /// The same policy with every threshold in its enforceable range.
    ///
    /// `coverage_percent` is kept within 1..=100 and `min_opportunities` is
    /// at least 1, so no gate can pass on an empty session.
    #[must_use]
    pub fn strict(self) -> Self {
        Self {
            coverage_percent: self.coverage_percent.clamp(1, 100),
            min_opportunities: self.min_opportunities.max(1),
        }
    }
}

// =============================================================================
// GATE REPORT
// =============================================================================

/// Outcome of evaluating the gate guarding `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    pub target: Stage,
    pub passed: bool,
    /// Unmet criteria, in a deterministic order. Empty when `passed`.
    pub reasons: Vec<String>,
}

impl GateReport {
    fn from_reasons(target: Stage, reasons: Vec<String>) -> Self {
        Self {
            target,
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

/// Integration coverage figures behind the Assessment gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub tool_count: usize,
    /// Distinct unordered pairs with at least one integration.
    pub covered_pairs: usize,
    /// `n * (n - 1) / 2`.
    pub possible_pairs: usize,
    /// `covered_pairs * 100 / possible_pairs`, rounded down.
    pub percent: u32,
}

impl CoverageStats {
    /// Compute coverage over the session's inventory and integrations.
    ///
    /// Integrations naming tools outside the inventory do not count.
    #[must_use]
    pub fn of(session: &AuditSession) -> Self {
        let tool_count = session.tool_inventory.len();
        let covered_pairs = session
            .integrations
            .iter()
            .filter_map(|i| i.pair_key())
            .filter(|(a, b)| {
                session.tool_inventory.contains_key(a) && session.tool_inventory.contains_key(b)
            })
            .collect::<BTreeSet<_>>()
            .len();
        let possible_pairs = tool_count.saturating_mul(tool_count.saturating_sub(1)) / 2;
        let percent = if possible_pairs > 0 {
            (covered_pairs.saturating_mul(100) / possible_pairs) as u32
        } else {
            0
        };
        Self {
            tool_count,
            covered_pairs,
            possible_pairs,
            percent,
        }
    }

    /// Whether coverage reaches `required_percent`, compared exactly.
    #[must_use]
    pub fn meets(&self, required_percent: u32) -> bool {
        self.possible_pairs > 0
            && (self.covered_pairs as u64).saturating_mul(100)
                >= (required_percent as u64).saturating_mul(self.possible_pairs as u64)
    }
}

// =============================================================================
// GATE VALIDATOR
// =============================================================================

/// Gate Validator - pure functions deciding whether a transition may happen.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateValidator {
    policy: GatePolicy,
}

impl GateValidator {
    /// Create a validator with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policy: GatePolicy::new(),
        }
    }

    /// Create a validator with a custom policy.
    ///
    /// Zero thresholds are raised to 1; see [`GatePolicy::strict`].
    #[must_use]
    pub fn with_policy(policy: GatePolicy) -> Self {
        Self {
            policy: policy.strict(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Evaluate the gate guarding entry into `target`.
    ///
    /// Discovery has no gate and always passes.
    #[must_use]
    pub fn evaluate(&self, target: Stage, session: &AuditSession) -> GateReport {
        match target {
            Stage::Discovery => GateReport::from_reasons(target, Vec::new()),
            Stage::Assessment => self.discovery_gate(session),
            Stage::Opportunities => self.assessment_gate(session),
            Stage::Delivery => self.opportunities_gate(session),
        }
    }

    /// Discovery gate: every tool carries category, version, users and
    /// discovery method.
    #[must_use]
    pub fn discovery_gate(&self, session: &AuditSession) -> GateReport {
        let mut reasons = Vec::new();
        if session.tool_inventory.is_empty() {
            reasons.push("tool inventory is empty".to_string());
        }
        for record in session.tool_inventory.values() {
            let missing = record.missing_required_fields();
            if !missing.is_empty() {
                reasons.push(format!("{} missing: {}", record.name, missing.join(", ")));
            }
        }
        GateReport::from_reasons(Stage::Assessment, reasons)
    }

    /// Assessment gate: integration coverage of possible tool pairs.
    #[must_use]
    pub fn assessment_gate(&self, session: &AuditSession) -> GateReport {
        let stats = CoverageStats::of(session);
        let mut reasons = Vec::new();
        if stats.tool_count < 2 {
            reasons.push(format!(
                "at least 2 tools are required to assess integrations (have {})",
                stats.tool_count
            ));
        } else if !stats.meets(self.policy.coverage_percent) {
            reasons.push(format!(
                "integration coverage {}/{} pairs ({}%) is below the required {}%",
                stats.covered_pairs,
                stats.possible_pairs,
                stats.percent,
                self.policy.coverage_percent
            ));
        }
        GateReport::from_reasons(Stage::Opportunities, reasons)
    }

    /// Opportunities gate: enough opportunities, all scored.
    #[must_use]
    pub fn opportunities_gate(&self, session: &AuditSession) -> GateReport {
        let mut reasons = Vec::new();
        let count = session.opportunities.len();
        if count < self.policy.min_opportunities {
            reasons.push(format!(
                "at least {} opportunities are required (have {count})",
                self.policy.min_opportunities
            ));
        }
        for opportunity in session.opportunities.iter().filter(|o| !o.is_scored()) {
            reasons.push(format!(
                "opportunity '{}' has no priority score",
                opportunity.name
            ));
        }
        GateReport::from_reasons(Stage::Delivery, reasons)
    }

    /// Final client-ready check.
    ///
    /// Informational only; it guards no transition.
    #[must_use]
    pub fn delivery_readiness(&self, session: &AuditSession) -> GateReport {
        let mut reasons = Vec::new();
        for stage in [Stage::Discovery, Stage::Assessment, Stage::Opportunities] {
            if !session.is_stage_complete(stage) {
                reasons.push(format!("stage {} is not complete", stage.index()));
            }
        }
        if session.tool_inventory.is_empty() {
            reasons.push("tool inventory is empty".to_string());
        }
        if session.opportunities.is_empty() {
            reasons.push("no opportunities recorded".to_string());
        }
        GateReport::from_reasons(Stage::Delivery, reasons)
    }
}

// =============================================================================
// TESTS
// =============================================================================
