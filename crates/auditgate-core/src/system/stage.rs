//! # Audit Stages
//!
//! The fixed, linear sequence an audit moves through.
//!
//! | Index | Stage | Gate guarding entry |
//! |-------|-------|---------------------|
//! | 1 | Discovery | none (initial) |
//! | 2 | Assessment | every tool fully described |
//! | 3 | Opportunities | integration coverage |
//! | 4 | Delivery | scored opportunities (terminal) |
//!
//! Stages only move forward, one step at a time.

use crate::types::AuditError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Audit stages, ordered by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// 1: Tool inventory collection.
    Discovery,
    /// 2: Integration mapping.
    Assessment,
    /// 3: Automation candidates.
    Opportunities,
    /// 4: Client-ready output.
    Delivery,
}

impl Stage {
    /// Every stage in order.
    pub const ALL: [Stage; 4] = [
        Stage::Discovery,
        Stage::Assessment,
        Stage::Opportunities,
        Stage::Delivery,
    ];

    /// Get the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Discovery => "Discovery",
            Stage::Assessment => "Assessment",
            Stage::Opportunities => "Opportunities",
            Stage::Delivery => "Delivery",
        }
    }

    /// One-based stage index, as used in `stage_completion`.
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Stage::Discovery => 1,
            Stage::Assessment => 2,
            Stage::Opportunities => 3,
            Stage::Delivery => 4,
        }
    }

    /// Look a stage up by its one-based index.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Stage> {
        Self::ALL.into_iter().find(|s| s.index() == index)
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Discovery => Some(Stage::Assessment),
            Stage::Assessment => Some(Stage::Opportunities),
            Stage::Opportunities => Some(Stage::Delivery),
            Stage::Delivery => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = AuditError;

    /// Accepts a stage name (any case) or its index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u8>() {
            return Stage::from_index(index)
                .ok_or_else(|| AuditError::InvalidRecord(format!("no stage with index {index}")));
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AuditError::InvalidRecord(format!(
                    "unknown stage '{trimmed}' (use discovery, assessment, opportunities, delivery)"
                ))
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order() {
        assert!(Stage::Discovery < Stage::Assessment);
        assert!(Stage::Assessment < Stage::Opportunities);
        assert!(Stage::Opportunities < Stage::Delivery);
    }

    #[test]
    fn stage_next() {
        assert_eq!(Stage::Discovery.next(), Some(Stage::Assessment));
        assert_eq!(Stage::Opportunities.next(), Some(Stage::Delivery));
        assert_eq!(Stage::Delivery.next(), None);
    }

    #[test]
    fn index_round_trips() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_index(stage.index()), Some(stage));
        }
        assert_eq!(Stage::from_index(0), None);
        assert_eq!(Stage::from_index(5), None);
    }

    #[test]
    fn parse_by_name_or_index() {
        assert_eq!("assessment".parse::<Stage>().expect("parse"), Stage::Assessment);
        assert_eq!(" DELIVERY ".parse::<Stage>().expect("parse"), Stage::Delivery);
        assert_eq!("3".parse::<Stage>().expect("parse"), Stage::Opportunities);
        assert!("review".parse::<Stage>().is_err());
        assert!("9".parse::<Stage>().is_err());
    }
}
