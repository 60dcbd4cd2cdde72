//! # Probe Registry
//!
//! Static knowledge the probes match against:
//! - DNS labels checked under a client domain
//! - Known hosting domains per SaaS service
//! - MX exchange patterns per mail provider
//! - API health-check endpoints per tool
//!
//! The built-in registry can be replaced wholesale from configuration.

use crate::error::DiscoveryError;
use auditgate_core::normalize_tool_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subdomain labels probed for CNAME records.
pub const DEFAULT_DNS_LABELS: [&str; 22] = [
    "mail",
    "email",
    "mx",
    "smtp",
    "zoom",
    "meet",
    "video",
    "slack",
    "teams",
    "chat",
    "jira",
    "confluence",
    "wiki",
    "github",
    "gitlab",
    "git",
    "aws",
    "azure",
    "cloud",
    "crm",
    "sales",
    "support",
];

/// A SaaS service recognizable from DNS alias targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Tool name used for inventory entries.
    pub display_name: String,
    pub category: String,
    /// Substrings of alias targets that identify the service.
    pub domains: Vec<String>,
}

/// A mail provider recognizable from MX exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxPattern {
    /// Substring of the exchange host name.
    pub contains: String,
    pub display_name: String,
    pub provider: String,
    pub category: String,
}

/// Everything the probes match against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeRegistry {
    pub dns_labels: Vec<String>,
    /// Service key -> spec.
    pub services: BTreeMap<String, ServiceSpec>,
    /// Checked in order; the first match wins.
    pub mx_patterns: Vec<MxPattern>,
    /// Normalized tool name -> health-check URL.
    pub api_endpoints: BTreeMap<String, String>,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn service(display_name: &str, category: &str, domains: &[&str]) -> ServiceSpec {
    ServiceSpec {
        display_name: display_name.to_string(),
        category: category.to_string(),
        domains: domains.iter().map(|d| d.to_string()).collect(),
    }
}

fn mx(contains: &str, display_name: &str, provider: &str) -> MxPattern {
    MxPattern {
        contains: contains.to_string(),
        display_name: display_name.to_string(),
        provider: provider.to_string(),
        category: "Email Services".to_string(),
    }
}

impl ProbeRegistry {
    /// The built-in catalog of common SaaS services.
    #[must_use]
    pub fn builtin() -> Self {
        let services = [
            ("zoom", service("Zoom", "Video Conferencing", &["zoom.us", "zoomgov.com"])),
            (
                "microsoft365",
                service(
                    "Microsoft 365",
                    "Productivity Suite",
                    &["outlook.office.com", "teams.microsoft.com", "office.com"],
                ),
            ),
            ("slack", service("Slack", "Communication", &["slack.com"])),
            (
                "salesforce",
                service("Salesforce", "CRM", &["salesforce.com", "force.com"]),
            ),
            (
                "google_workspace",
                service(
                    "Google Workspace",
                    "Productivity Suite",
                    &["gmail.com", "googlemail.com"],
                ),
            ),
            (
                "atlassian",
                service(
                    "Atlassian",
                    "Development Tools",
                    &["atlassian.net", "atlassian.com"],
                ),
            ),
            (
                "github",
                service("GitHub", "Development Tools", &["github.com", "github.io"]),
            ),
            (
                "aws",
                service("AWS", "Cloud Services", &["amazonaws.com", "aws.amazon.com"]),
            ),
        ]
        .into_iter()
        .map(|(key, spec)| (key.to_string(), spec))
        .collect();

        let api_endpoints = [
            ("zoom", "https://api.zoom.us/v2/users/me"),
            ("microsoft 365", "https://graph.microsoft.com/v1.0/me"),
            ("slack", "https://slack.com/api/auth.test"),
            ("github", "https://api.github.com/user"),
        ]
        .into_iter()
        .map(|(tool, url)| (tool.to_string(), url.to_string()))
        .collect();

        Self {
            dns_labels: DEFAULT_DNS_LABELS.iter().map(|l| l.to_string()).collect(),
            services,
            mx_patterns: vec![
                mx("google", "Google Workspace", "Google"),
                mx("microsoft", "Microsoft 365", "Microsoft"),
                mx("outlook", "Microsoft 365", "Microsoft"),
            ],
            api_endpoints,
        }
    }

    /// Reject registries the probes cannot use.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        let invalid = |msg: String| Err(DiscoveryError::InvalidRegistry(msg));

        for label in &self.dns_labels {
            let ok = !label.is_empty()
                && label.len() <= 63
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !ok {
                return invalid(format!("DNS label {label:?} is not a valid host label"));
            }
        }
        for (key, spec) in &self.services {
            if spec.display_name.trim().is_empty() {
                return invalid(format!("service '{key}' has no display name"));
            }
            if spec.domains.is_empty() || spec.domains.iter().any(|d| d.trim().is_empty()) {
                return invalid(format!("service '{key}' has no usable domain patterns"));
            }
        }
        for pattern in &self.mx_patterns {
            if pattern.contains.trim().is_empty() || pattern.display_name.trim().is_empty() {
                return invalid("MX pattern with empty match or name".to_string());
            }
        }
        for (tool, url) in &self.api_endpoints {
            if normalize_tool_name(tool) != *tool || tool.is_empty() {
                return invalid(format!("API endpoint key {tool:?} is not a normalized tool name"));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return invalid(format!("API endpoint for '{tool}' is not an http(s) URL"));
            }
        }
        Ok(())
    }

    /// Match an alias target against known services.
    ///
    /// Returns the service and the domain pattern that matched.
    #[must_use]
    pub fn match_alias(&self, alias_target: &str) -> Option<(&ServiceSpec, &str)> {
        let target = alias_target.to_ascii_lowercase();
        self.services.values().find_map(|spec| {
            spec.domains
                .iter()
                .find(|domain| target.contains(domain.to_ascii_lowercase().as_str()))
                .map(|domain| (spec, domain.as_str()))
        })
    }

    /// Match an MX exchange against known mail providers.
    #[must_use]
    pub fn match_mx(&self, exchange: &str) -> Option<&MxPattern> {
        let host = exchange.to_ascii_lowercase();
        self.mx_patterns
            .iter()
            .find(|p| host.contains(p.contains.to_ascii_lowercase().as_str()))
    }

    /// Health-check endpoint for a tool, if one is known.
    ///
    /// Exact normalized name first, then the first registered name contained
    /// in the tool name (so "GitHub Enterprise" uses the GitHub endpoint).
    #[must_use]
    pub fn api_endpoint_for(&self, tool_name: &str) -> Option<&str> {
        let key = normalize_tool_name(tool_name);
        if key.is_empty() {
            return None;
        }
        self.api_endpoints
            .get(&key)
            .or_else(|| {
                self.api_endpoints
                    .iter()
                    .find(|(known, _)| key.contains(known.as_str()))
                    .map(|(_, url)| url)
            })
            .map(String::as_str)
    }
}

// =============================================================================
// TESTS
// =============================================================================
