//! # Ingestor Module
//!
//! Tabular tool inventory ingestion.
//!
//! - Validate the header row before reading any data
//! - Skip rows without a tool name
//! - Keep the first row for each tool (names compared normalized)
//! - No enrichment: rows become [`ToolPatch`]es tagged `manual-inventory`

use crate::primitives::{MAX_INVENTORY_ROWS, MAX_TOOL_NAME_LENGTH};
use crate::types::normalize_tool_name;
use crate::{AuditError, DiscoveryMethod, ToolPatch};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

/// Column holding the tool name.
pub const COLUMN_TOOL_NAME: &str = "Tool Name";
/// Column holding the tool category.
pub const COLUMN_CATEGORY: &str = "Category";
/// Column holding comma-separated user roles.
pub const COLUMN_USED_BY: &str = "Used By";
/// Column holding the business criticality.
pub const COLUMN_CRITICALITY: &str = "Criticality";
/// Optional column holding the tool version.
pub const COLUMN_VERSION: &str = "Version";

/// Criticality assumed for rows that leave it blank.
pub const DEFAULT_CRITICALITY: &str = "Medium";

/// Resolved column positions for one input.
struct Columns {
    name: usize,
    category: usize,
    used_by: usize,
    criticality: usize,
    version: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, AuditError> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        };
        let missing: Vec<&str> = [
            COLUMN_TOOL_NAME,
            COLUMN_CATEGORY,
            COLUMN_USED_BY,
            COLUMN_CRITICALITY,
        ]
        .into_iter()
        .filter(|c| find(*c).is_none())
        .collect();
        match (
            find(COLUMN_TOOL_NAME),
            find(COLUMN_CATEGORY),
            find(COLUMN_USED_BY),
            find(COLUMN_CRITICALITY),
        ) {
            (Some(name), Some(category), Some(used_by), Some(criticality)) => Ok(Self {
                name,
                category,
                used_by,
                criticality,
                version: find(COLUMN_VERSION),
            }),
            _ => Err(AuditError::InvalidInventory(format!(
                "missing required columns: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// The Ingestor turns an inventory table into tool patches.
pub struct Ingestor;

impl Ingestor {
    /// Read an inventory CSV file.
    pub fn ingest_path(path: impl AsRef<Path>) -> Result<BTreeMap<String, ToolPatch>, AuditError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| AuditError::InvalidInventory(format!("{}: {e}", path.display())))?;
        Self::ingest_reader(file)
    }

    /// Read inventory CSV from any reader.
    ///
    /// Returns display name -> patch. Fails with `InvalidInventory` when a
    /// required column is missing or no row is usable.
    pub fn ingest_reader<R: Read>(reader: R) -> Result<BTreeMap<String, ToolPatch>, AuditError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| AuditError::InvalidInventory(e.to_string()))?
            .clone();
        let columns = Columns::resolve(&headers)?;

        let mut seen = BTreeSet::new();
        let mut patches = BTreeMap::new();
        for (row_index, row) in csv_reader.records().enumerate() {
            if row_index >= MAX_INVENTORY_ROWS {
                return Err(AuditError::InvalidInventory(format!(
                    "more than {MAX_INVENTORY_ROWS} rows"
                )));
            }
            let row = row.map_err(|e| AuditError::InvalidInventory(e.to_string()))?;
            let cell = |index: usize| row.get(index).map(str::trim).unwrap_or("");

            let name = cell(columns.name)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if name.is_empty() {
                continue;
            }
            if name.len() > MAX_TOOL_NAME_LENGTH {
                return Err(AuditError::InvalidInventory(format!(
                    "row {}: tool name exceeds {MAX_TOOL_NAME_LENGTH} bytes",
                    row_index + 2
                )));
            }
            if !seen.insert(normalize_tool_name(&name)) {
                continue;
            }

            patches.insert(name, Self::row_patch(&columns, &cell));
        }

        if patches.is_empty() {
            return Err(AuditError::InvalidInventory(
                "no rows with a tool name".to_string(),
            ));
        }
        Ok(patches)
    }

    /// Read inventory CSV from a string.
    pub fn ingest_str(input: &str) -> Result<BTreeMap<String, ToolPatch>, AuditError> {
        Self::ingest_reader(input.as_bytes())
    }

    fn row_patch<'r>(columns: &Columns, cell: &impl Fn(usize) -> &'r str) -> ToolPatch {
        let mut patch = ToolPatch::discovered_by(DiscoveryMethod::ManualInventory);

        let category = cell(columns.category);
        if !category.is_empty() {
            patch.category = Some(category.to_string());
        }

        let criticality = cell(columns.criticality);
        patch.criticality = Some(if criticality.is_empty() {
            DEFAULT_CRITICALITY.to_string()
        } else {
            criticality.to_string()
        });

        let users: BTreeSet<String> = cell(columns.used_by)
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();
        if !users.is_empty() {
            patch.users = Some(users);
        }

        if let Some(index) = columns.version {
            let version = cell(index);
            if !version.is_empty() {
                patch.version = Some(version.to_string());
            }
        }
        patch
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "\
Tool Name,Category,Used By,Criticality,Version
Slack,Communication,\"Ops, Sales\",High,4.36
Zoom,Video Conferencing,All Staff,,5.17
 slack ,Chat,Eng,Low,1.0
,Orphan,Ops,Low,1
Jira,Project Management,,Medium,
";

    #[test]
    fn rows_become_manual_patches() {
        let patches = Ingestor::ingest_str(INVENTORY).expect("ingest");
        assert_eq!(patches.len(), 3);

        let slack = &patches["Slack"];
        assert_eq!(slack.category.as_deref(), Some("Communication"));
        assert_eq!(slack.version.as_deref(), Some("4.36"));
        assert_eq!(slack.discovery_method, Some(DiscoveryMethod::ManualInventory));
        let users = slack.users.as_ref().expect("users");
        assert!(users.contains("Ops") && users.contains("Sales"));
    }

    #[test]
    fn duplicates_keep_first_row() {
        let patches = Ingestor::ingest_str(INVENTORY).expect("ingest");
        assert!(!patches.contains_key("slack"));
        assert_eq!(patches["Slack"].criticality.as_deref(), Some("High"));
    }

    #[test]
    fn blanks_default_or_stay_empty() {
        let patches = Ingestor::ingest_str(INVENTORY).expect("ingest");
        assert_eq!(patches["Zoom"].criticality.as_deref(), Some("Medium"));
        assert_eq!(patches["Jira"].users, None);
        assert_eq!(patches["Jira"].version, None);
    }

    #[test]
    fn version_column_is_optional() {
        let csv = "Tool Name,Category,Used By,Criticality\nGitHub,Development Tools,Eng,High\n";
        let patches = Ingestor::ingest_str(csv).expect("ingest");
        assert_eq!(patches["GitHub"].version, None);
    }

    #[test]
    fn headers_are_trimmed_and_case_insensitive() {
        let csv = " tool name , CATEGORY,used by,Criticality\nAWS,Cloud Services,Eng,High\n";
        assert!(Ingestor::ingest_str(csv).is_ok());
    }

    #[test]
    fn missing_columns_named() {
        let err = Ingestor::ingest_str("Tool Name,Category\nSlack,Chat\n").expect_err("columns");
        let text = err.to_string();
        assert!(text.contains("Used By"));
        assert!(text.contains("Criticality"));
    }

    #[test]
    fn no_usable_rows() {
        let err = Ingestor::ingest_str("Tool Name,Category,Used By,Criticality\n,,,\n")
            .expect_err("empty");
        assert!(matches!(err, AuditError::InvalidInventory(_)));
    }
}
