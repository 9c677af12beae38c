//! Sport categories
//!
//! Maps device sport-type codes onto the categories this tool knows how to
//! export. Unknown codes still resolve, to [`SportCategory::Unsupported`].

use crate::types::Sport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved classification of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportCategory {
    Running,
    Walking,
    Cycling,
    IndoorSwimming,
    /// Code with no mapping; carries the raw code when there was one
    Unsupported(Option<i64>),
}

/// How a category is turned into messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBranch {
    /// Per-second records with position and altitude
    OutdoorWithPosition,
    /// Lap and session only, from pool statistics
    PoolBased,
}

impl SportCategory {
    /// Every exportable category
    pub const EXPORTABLE: [SportCategory; 4] = [
        SportCategory::Running,
        SportCategory::Walking,
        SportCategory::Cycling,
        SportCategory::IndoorSwimming,
    ];

    /// Resolve a device sport-type code
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => SportCategory::Running,
            Some(6) => SportCategory::Walking,
            Some(9) => SportCategory::Cycling,
            Some(14) => SportCategory::IndoorSwimming,
            other => SportCategory::Unsupported(other),
        }
    }

    /// Device code of a known category
    pub fn code(&self) -> Option<i64> {
        match self {
            SportCategory::Running => Some(1),
            SportCategory::Walking => Some(6),
            SportCategory::Cycling => Some(9),
            SportCategory::IndoorSwimming => Some(14),
            SportCategory::Unsupported(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportCategory::Running => "running",
            SportCategory::Walking => "walking",
            SportCategory::Cycling => "cycling",
            SportCategory::IndoorSwimming => "indoor_swimming",
            SportCategory::Unsupported(_) => "unsupported",
        }
    }

    /// Export branch, or `None` when the category cannot be exported
    pub fn branch(&self) -> Option<ExportBranch> {
        match self {
            SportCategory::Running | SportCategory::Walking | SportCategory::Cycling => {
                Some(ExportBranch::OutdoorWithPosition)
            }
            SportCategory::IndoorSwimming => Some(ExportBranch::PoolBased),
            SportCategory::Unsupported(_) => None,
        }
    }

    pub fn is_exportable(&self) -> bool {
        self.branch().is_some()
    }

    /// Whether records may carry cadence and step length
    pub fn gait_supported(&self) -> bool {
        matches!(self, SportCategory::Running | SportCategory::Walking)
    }

    /// FIT sport written into the session
    pub fn fit_sport(&self) -> Sport {
        match self {
            SportCategory::Running => Sport::Running,
            SportCategory::Walking => Sport::Walking,
            SportCategory::Cycling => Sport::Cycling,
            SportCategory::IndoorSwimming => Sport::Swimming,
            SportCategory::Unsupported(_) => Sport::Generic,
        }
    }
}

impl fmt::Display for SportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SportCategory::Unsupported(Some(code)) => write!(f, "unknown-{code}"),
            SportCategory::Unsupported(None) => write!(f, "unknown"),
            known => f.write_str(known.as_str()),
        }
    }
}
