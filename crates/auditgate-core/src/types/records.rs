//! Inventory, integration and opportunity records.

use super::{AuditError, normalize_tool_name};
use crate::primitives::UNKNOWN_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// =============================================================================
// DISCOVERY METHOD
// =============================================================================

/// How a tool record was first catalogued.
///
/// Required on every record for audit traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
    /// Seeded from a tabular inventory upload.
    ManualInventory,
    /// Entered by hand through the CLI or API.
    ManualEntry,
    /// Found through a DNS alias (CNAME) record of the client domain.
    DnsAlias,
    /// Found through the client domain's MX records.
    MxRecord,
    /// Observed through an API health-check probe.
    ApiProbe,
}

impl DiscoveryMethod {
    /// Stable tag used in documents and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMethod::ManualInventory => "manual-inventory",
            DiscoveryMethod::ManualEntry => "manual-entry",
            DiscoveryMethod::DnsAlias => "dns-alias",
            DiscoveryMethod::MxRecord => "mx-record",
            DiscoveryMethod::ApiProbe => "api-probe",
        }
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// API STATUS
// =============================================================================

/// Outcome of an API health-check probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    /// The endpoint answered with a 2xx status.
    Active,
    /// The endpoint answered with a non-2xx status.
    Unreachable,
    /// The request timed out or failed at the transport level.
    Error,
}

impl ApiStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStatus::Active => "active",
            ApiStatus::Unreachable => "unreachable",
            ApiStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TOOL RECORD
// =============================================================================

/// One catalogued technology.
///
/// Descriptive fields (`name` through `evidence`) follow the non-destructive
/// merge rule: once non-empty they are never overwritten. Observation fields
/// (`api_status` onwards) always hold the most recent probe outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Display spelling of the tool name, as first seen.
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub criticality: String,
    /// Roles or departments using the tool.
    #[serde(default)]
    pub users: BTreeSet<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub discovery_method: Option<DiscoveryMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_status: Option<ApiStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_discovery: Option<DateTime<Utc>>,
}

impl ToolRecord {
    /// Create a record carrying only a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a record from a patch applied to an empty record.
    #[must_use]
    pub fn from_patch(name: impl Into<String>, patch: &ToolPatch) -> Self {
        let mut record = Self::named(name);
        record.apply(patch);
        record
    }

    /// Names of the fields the Discovery gate requires that are empty here.
    ///
    /// Order is fixed: category, version, users, discovery_method.
    #[must_use]
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.category.trim().is_empty() {
            missing.push("category");
        }
        if self.version.trim().is_empty() {
            missing.push("version");
        }
        if self.users.iter().all(|u| u.trim().is_empty()) {
            missing.push("users");
        }
        if self.discovery_method.is_none() {
            missing.push("discovery_method");
        }
        missing
    }

    /// Apply a patch using the non-destructive merge rule.
    ///
    /// Returns `true` if any field changed.
    pub fn apply(&mut self, patch: &ToolPatch) -> bool {
        let mut changed = false;
        changed |= fill_text(&mut self.category, patch.category.as_deref());
        changed |= fill_text(&mut self.criticality, patch.criticality.as_deref());
        changed |= fill_version(&mut self.version, patch.version.as_deref());

        if self.users.iter().all(|u| u.trim().is_empty()) {
            if let Some(users) = &patch.users {
                let cleaned = clean_users(users);
                if !cleaned.is_empty() {
                    self.users = cleaned;
                    changed = true;
                }
            }
        }

        if self.discovery_method.is_none() && patch.discovery_method.is_some() {
            self.discovery_method = patch.discovery_method;
            changed = true;
        }
        changed |= fill_option(&mut self.provider, patch.provider.as_deref());
        changed |= fill_option(&mut self.evidence, patch.evidence.as_deref());

        // A probe outcome replaces the previous one as a whole.
        if patch.api_status.is_some() {
            changed |= replace(&mut self.api_status, patch.api_status);
            changed |= replace(&mut self.api_endpoint, patch.api_endpoint.clone());
            changed |= replace(&mut self.status_code, patch.status_code);
            changed |= replace(&mut self.diagnostic, patch.diagnostic.clone());
        }
        changed |= observe(&mut self.last_discovery, patch.last_discovery);
        changed
    }
}

fn fill_text(slot: &mut String, value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) if slot.trim().is_empty() && !v.is_empty() => {
            *slot = v.to_string();
            true
        }
        _ => false,
    }
}

fn fill_version(slot: &mut String, value: Option<&str>) -> bool {
    let fillable = slot.trim().is_empty() || slot.trim().eq_ignore_ascii_case(UNKNOWN_VERSION);
    match value.map(str::trim) {
        Some(v) if fillable && !v.is_empty() && v != slot.as_str() => {
            // A placeholder never replaces another placeholder.
            if v.eq_ignore_ascii_case(UNKNOWN_VERSION) && !slot.trim().is_empty() {
                return false;
            }
            *slot = v.to_string();
            true
        }
        _ => false,
    }
}

fn fill_option(slot: &mut Option<String>, value: Option<&str>) -> bool {
    let empty = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    match value.map(str::trim) {
        Some(v) if empty && !v.is_empty() => {
            *slot = Some(v.to_string());
            true
        }
        _ => false,
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn observe<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(&v) => {
            *slot = Some(v);
            true
        }
        _ => false,
    }
}

fn clean_users(users: &BTreeSet<String>) -> BTreeSet<String> {
    users
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// TOOL PATCH
// =============================================================================

/// A partial [`ToolRecord`] produced by ingestion or discovery.
///
/// Every field is optional and `None` means "no information". The exception
/// is a patch carrying `api_status`: it is a complete probe outcome, so its
/// `None` endpoint, status code or diagnostic clears the recorded one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPatch {
    pub category: Option<String>,
    pub criticality: Option<String>,
    pub users: Option<BTreeSet<String>>,
    pub version: Option<String>,
    pub discovery_method: Option<DiscoveryMethod>,
    pub provider: Option<String>,
    pub evidence: Option<String>,
    pub api_status: Option<ApiStatus>,
    pub api_endpoint: Option<String>,
    pub status_code: Option<u16>,
    pub diagnostic: Option<String>,
    pub last_discovery: Option<DateTime<Utc>>,
}

impl ToolPatch {
    /// Create an empty patch tagged with a discovery method.
    #[must_use]
    pub fn discovered_by(method: DiscoveryMethod) -> Self {
        Self {
            discovery_method: Some(method),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_criticality(mut self, criticality: impl Into<String>) -> Self {
        self.criticality = Some(criticality.into());
        self
    }

    #[must_use]
    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = Some(users.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Whether the patch carries no information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold another patch into this one.
    ///
    /// Descriptive fields keep the first non-blank value; observation fields
    /// take `other`'s probe outcome as a group when it has one. This is the
    /// same rule [`ToolRecord::apply`] uses, so combining patches first and
    /// applying once gives the same record as applying them in sequence.
    pub fn absorb(&mut self, other: ToolPatch) {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().is_none_or(|v| v.trim().is_empty())
        }
        fn keep(slot: &mut Option<String>, value: Option<String>) {
            if blank(slot) && !blank(&value) {
                *slot = value;
            }
        }
        keep(&mut self.category, other.category);
        keep(&mut self.criticality, other.criticality);
        let no_users = |users: &Option<BTreeSet<String>>| {
            users
                .as_ref()
                .is_none_or(|u| u.iter().all(|name| name.trim().is_empty()))
        };
        if no_users(&self.users) && !no_users(&other.users) {
            self.users = other.users;
        }
        let placeholder = self
            .version
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(UNKNOWN_VERSION));
        if blank(&self.version) || placeholder {
            let incoming_placeholder = other
                .version
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(UNKNOWN_VERSION));
            if !blank(&other.version) && !(placeholder && incoming_placeholder) {
                self.version = other.version;
            }
        }
        if self.discovery_method.is_none() {
            self.discovery_method = other.discovery_method;
        }
        keep(&mut self.provider, other.provider);
        keep(&mut self.evidence, other.evidence);

        if other.api_status.is_some() {
            self.api_status = other.api_status;
            self.api_endpoint = other.api_endpoint;
            self.status_code = other.status_code;
            self.diagnostic = other.diagnostic;
        }
        if other.last_discovery.is_some() {
            self.last_discovery = other.last_discovery;
        }
    }
}

// =============================================================================
// INTEGRATION RECORD
// =============================================================================

/// Health of an integration between two tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Broken,
    Missing,
    Unknown,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Broken => "broken",
            HealthStatus::Missing => "missing",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for HealthStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "broken" => Ok(HealthStatus::Broken),
            "missing" => Ok(HealthStatus::Missing),
            "unknown" => Ok(HealthStatus::Unknown),
            other => Err(AuditError::InvalidRecord(format!(
                "unknown health status '{other}' (use healthy, degraded, broken, missing, unknown)"
            ))),
        }
    }
}

/// Mechanism through which two tools exchange data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationType {
    Api,
    Webhook,
    Database,
    FileSync,
    EmailSync,
    CalendarSync,
    Sso,
    Manual,
    None,
    Unknown,
}

impl FromStr for IntegrationType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "api" => Ok(IntegrationType::Api),
            "webhook" => Ok(IntegrationType::Webhook),
            "database" => Ok(IntegrationType::Database),
            "file-sync" => Ok(IntegrationType::FileSync),
            "email-sync" => Ok(IntegrationType::EmailSync),
            "calendar-sync" => Ok(IntegrationType::CalendarSync),
            "sso" => Ok(IntegrationType::Sso),
            "manual" => Ok(IntegrationType::Manual),
            "none" => Ok(IntegrationType::None),
            "unknown" => Ok(IntegrationType::Unknown),
            other => Err(AuditError::InvalidRecord(format!(
                "unknown integration type '{other}'"
            ))),
        }
    }
}

/// A directed relationship between two inventoried tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub source_tool: String,
    pub target_tool: String,
    pub integration_type: IntegrationType,
    pub health_status: HealthStatus,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl IntegrationRecord {
    #[must_use]
    pub fn new(
        source_tool: impl Into<String>,
        target_tool: impl Into<String>,
        integration_type: IntegrationType,
        health_status: HealthStatus,
    ) -> Self {
        Self {
            source_tool: source_tool.into(),
            target_tool: target_tool.into(),
            integration_type,
            health_status,
            issues: Vec::new(),
            notes: None,
        }
    }

    /// Unordered, normalized tool pair this integration covers.
    ///
    /// `None` for a tool integrated with itself, which covers no pair.
    #[must_use]
    pub fn pair_key(&self) -> Option<(String, String)> {
        let a = normalize_tool_name(&self.source_tool);
        let b = normalize_tool_name(&self.target_tool);
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some((a, b)),
            std::cmp::Ordering::Greater => Some((b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }
}

// =============================================================================
// OPPORTUNITY RECORD
// =============================================================================

/// A candidate automation.
///
/// A `priority_score` of zero means "not yet scored".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub name: String,
    #[serde(default)]
    pub priority_score: i64,
    /// Tools the automation touches; each must be in the inventory.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OpportunityRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, priority_score: i64) -> Self {
        Self {
            name: name.into(),
            priority_score,
            tools: Vec::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the opportunity has been scored.
    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.priority_score != 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_slack() -> ToolRecord {
        ToolRecord::from_patch(
            "Slack",
            &ToolPatch::discovered_by(DiscoveryMethod::ManualInventory)
                .with_category("Communication")
                .with_users(["Ops"])
                .with_version("4.36"),
        )
    }

    #[test]
    fn apply_fills_only_empty_fields() {
        let mut record = manual_slack();
        let patch = ToolPatch::discovered_by(DiscoveryMethod::ApiProbe)
            .with_category("Chat")
            .with_version("9.9")
            .with_provider("slack.com");

        assert!(record.apply(&patch));
        assert_eq!(record.category, "Communication");
        assert_eq!(record.version, "4.36");
        assert_eq!(
            record.discovery_method,
            Some(DiscoveryMethod::ManualInventory)
        );
        assert_eq!(record.provider.as_deref(), Some("slack.com"));
    }

    #[test]
    fn unknown_version_is_fillable() {
        let mut record = ToolRecord::named("Zoom");
        record.apply(&ToolPatch::default().with_version("unknown"));
        assert_eq!(record.version, "unknown");

        record.apply(&ToolPatch::default().with_version("unknown"));
        assert_eq!(record.version, "unknown");

        assert!(record.apply(&ToolPatch::default().with_version("v2")));
        assert_eq!(record.version, "v2");
    }

    #[test]
    fn observations_describe_the_latest_probe_only() {
        let mut record = manual_slack();
        let rejected = ToolPatch {
            api_status: Some(ApiStatus::Unreachable),
            api_endpoint: Some("https://slack.com/api/auth.test".into()),
            status_code: Some(401),
            diagnostic: Some("HTTP 401".into()),
            ..ToolPatch::default()
        };
        let timed_out = ToolPatch {
            api_status: Some(ApiStatus::Error),
            api_endpoint: Some("https://slack.com/api/auth.test".into()),
            diagnostic: Some("timed out after 200 ms".into()),
            ..ToolPatch::default()
        };
        let healthy = ToolPatch {
            api_status: Some(ApiStatus::Active),
            api_endpoint: Some("https://slack.com/api/auth.test".into()),
            status_code: Some(200),
            ..ToolPatch::default()
        };

        record.apply(&rejected);
        assert!(record.apply(&timed_out));
        assert_eq!(record.api_status, Some(ApiStatus::Error));
        assert_eq!(record.status_code, None);
        assert_eq!(record.diagnostic.as_deref(), Some("timed out after 200 ms"));

        assert!(record.apply(&healthy));
        assert_eq!(record.api_status, Some(ApiStatus::Active));
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.diagnostic, None);
    }

    #[test]
    fn patch_without_status_keeps_observations() {
        let mut record = manual_slack();
        record.apply(&ToolPatch {
            api_status: Some(ApiStatus::Active),
            status_code: Some(200),
            ..ToolPatch::default()
        });
        assert!(!record.apply(&ToolPatch::default().with_category("Chat")));
        assert_eq!(record.status_code, Some(200));
    }

    #[test]
    fn blank_users_are_ignored() {
        let mut record = ToolRecord::named("Jira");
        assert!(!record.apply(&ToolPatch::default().with_users(["  ", ""])));
        assert!(record.users.is_empty());
        assert!(record.apply(&ToolPatch::default().with_users([" Eng "])));
        assert!(record.users.contains("Eng"));
    }

    #[test]
    fn missing_required_fields_in_fixed_order() {
        let record = ToolRecord::named("Bare");
        assert_eq!(
            record.missing_required_fields(),
            vec!["category", "version", "users", "discovery_method"]
        );
        assert!(manual_slack().missing_required_fields().is_empty());
    }

    #[test]
    fn absorb_matches_sequential_apply() {
        let dns = ToolPatch::discovered_by(DiscoveryMethod::DnsAlias)
            .with_category("Video Conferencing")
            .with_version("unknown");
        let api = ToolPatch {
            api_status: Some(ApiStatus::Active),
            ..ToolPatch::discovered_by(DiscoveryMethod::ApiProbe).with_version("2.1")
        };

        let mut sequential = ToolRecord::named("Zoom");
        sequential.apply(&dns);
        sequential.apply(&api);

        let mut combined = dns.clone();
        combined.absorb(api);
        let folded = ToolRecord::from_patch("Zoom", &combined);

        assert_eq!(sequential, folded);
        assert_eq!(folded.version, "2.1");
        assert_eq!(folded.discovery_method, Some(DiscoveryMethod::DnsAlias));
    }

    #[test]
    fn absorb_skips_blank_values() {
        let blank = ToolPatch::discovered_by(DiscoveryMethod::ManualEntry)
            .with_category("  ")
            .with_users([""])
            .with_version("");
        let filled = ToolPatch::default()
            .with_category("Ticketing")
            .with_users(["Support"])
            .with_version("9.12");

        let mut sequential = ToolRecord::named("Jira");
        sequential.apply(&blank);
        sequential.apply(&filled);

        let mut combined = blank.clone();
        combined.absorb(filled);
        assert_eq!(combined.category.as_deref(), Some("Ticketing"));
        assert_eq!(ToolRecord::from_patch("Jira", &combined), sequential);
        assert!(sequential.missing_required_fields().is_empty());
    }

    #[test]
    fn absorb_replaces_probe_outcome_as_a_group() {
        let mut combined = ToolPatch {
            api_status: Some(ApiStatus::Unreachable),
            status_code: Some(401),
            diagnostic: Some("HTTP 401".into()),
            ..ToolPatch::default()
        };
        combined.absorb(ToolPatch {
            api_status: Some(ApiStatus::Active),
            status_code: Some(200),
            ..ToolPatch::default()
        });
        assert_eq!(combined.status_code, Some(200));
        assert_eq!(combined.diagnostic, None);
    }

    #[test]
    fn pair_key_is_unordered_and_skips_self() {
        let ab = IntegrationRecord::new(
            "Zoom",
            "Slack",
            IntegrationType::Api,
            HealthStatus::Healthy,
        );
        let ba = IntegrationRecord::new(
            "slack",
            " ZOOM ",
            IntegrationType::Webhook,
            HealthStatus::Broken,
        );
        assert_eq!(ab.pair_key(), ba.pair_key());

        let own = IntegrationRecord::new("Zoom", "zoom", IntegrationType::Api, HealthStatus::Healthy);
        assert_eq!(own.pair_key(), None);
    }

    #[test]
    fn integration_type_parses_snake_and_kebab() {
        assert_eq!(
            "file_sync".parse::<IntegrationType>().expect("parse"),
            IntegrationType::FileSync
        );
        assert_eq!(
            "Calendar-Sync".parse::<IntegrationType>().expect("parse"),
            IntegrationType::CalendarSync
        );
        assert!("carrier-pigeon".parse::<IntegrationType>().is_err());
    }

    #[test]
    fn discovery_method_serializes_kebab_case() {
        let json = serde_json::to_string(&DiscoveryMethod::ManualInventory).expect("serialize");
        assert_eq!(json, "\"manual-inventory\"");
    }
}
