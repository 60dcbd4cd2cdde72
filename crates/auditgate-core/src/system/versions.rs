//! # Version Check
//!
//! Compares each tool's recorded version with the latest known release.
//!
//! The catalog maps a name pattern to a latest version; a tool matches when
//! its normalized name contains the pattern, and the longest matching
//! pattern wins. Versions compare component by component as integers
//! (`5.9 < 5.14`), so no float parsing is involved. Versions that cannot be
//! read that way only compare equal to themselves.

use crate::primitives::UNKNOWN_VERSION;
use crate::types::{ToolRecord, normalize_tool_name};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Latest known releases of commonly audited tools.
const BUILTIN_LATEST: [(&str, &str); 6] = [
    ("zoom", "5.17.1"),
    ("slack", "4.36.2"),
    ("microsoft 365", "16.0.17"),
    ("office 365", "16.0.17"),
    ("factset", "2024.1"),
    ("bloomberg", "5.15"),
];

/// How a tool's version relates to the latest known release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Current,
    Outdated,
    /// Newer than the catalog knows about.
    Ahead,
    /// No version recorded, no catalog entry, or not comparable.
    Unknown,
}

/// Version verdict for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCheck {
    pub tool: String,
    pub current: String,
    pub latest: Option<String>,
    pub status: VersionStatus,
}

/// Name pattern -> latest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionCatalog {
    pub latest: BTreeMap<String, String>,
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VersionCatalog {
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            latest: BUILTIN_LATEST
                .iter()
                .map(|(pattern, version)| (pattern.to_string(), version.to_string()))
                .collect(),
        }
    }

    /// Latest known version for `tool_name`, if any pattern matches.
    #[must_use]
    pub fn latest_for(&self, tool_name: &str) -> Option<&str> {
        let name = normalize_tool_name(tool_name);
        self.latest
            .iter()
            .map(|(pattern, version)| (normalize_tool_name(pattern), version))
            .filter(|(pattern, _)| !pattern.is_empty() && name.contains(pattern.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(|(_, version)| version.as_str())
    }

    /// Check one inventoried tool.
    #[must_use]
    pub fn check(&self, record: &ToolRecord) -> VersionCheck {
        let latest = self.latest_for(&record.name).map(str::to_string);
        let status = match &latest {
            Some(latest) => compare_versions(&record.version, latest),
            None => VersionStatus::Unknown,
        };
        VersionCheck {
            tool: record.name.clone(),
            current: record.version.trim().to_string(),
            latest,
            status,
        }
    }
}

/// Compare a recorded version with the latest release.
#[must_use]
pub fn compare_versions(current: &str, latest: &str) -> VersionStatus {
    let current = current.trim();
    let latest = latest.trim();
    let placeholder = |v: &str| v.is_empty() || v.eq_ignore_ascii_case(UNKNOWN_VERSION);
    if placeholder(current) || placeholder(latest) {
        return VersionStatus::Unknown;
    }
    match (components(current), components(latest)) {
        (Some(a), Some(b)) => match cmp_components(&a, &b) {
            Ordering::Less => VersionStatus::Outdated,
            Ordering::Equal => VersionStatus::Current,
            Ordering::Greater => VersionStatus::Ahead,
        },
        _ if current.eq_ignore_ascii_case(latest) => VersionStatus::Current,
        _ => VersionStatus::Unknown,
    }
}

/// `v5.17.1` -> `[5, 17, 1]`. Pre-release and build suffixes are ignored.
fn components(version: &str) -> Option<Vec<u64>> {
    let version = version.trim_start_matches(['v', 'V']);
    let core = version.split(['-', '+', ' ']).next().unwrap_or("");
    if core.is_empty() {
        return None;
    }
    core.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

fn cmp_components(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}
