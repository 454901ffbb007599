//! Classification of an issue for planning purposes

use serde::{Deserialize, Serialize};

use super::issue::Issue;

/// Working minutes in one estimated day (8h)
pub const MINUTES_PER_DAY: f64 = 480.0;

/// Planning category, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Blocking,
    Dependent,
    Administrative,
    LongRunning,
    PriorityEligible,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Dependent => write!(f, "dependent"),
            Self::Administrative => write!(f, "administrative"),
            Self::LongRunning => write!(f, "long_running"),
            Self::PriorityEligible => write!(f, "priority_eligible"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocking" => Ok(Self::Blocking),
            "dependent" => Ok(Self::Dependent),
            "administrative" => Ok(Self::Administrative),
            "long_running" => Ok(Self::LongRunning),
            "priority_eligible" => Ok(Self::PriorityEligible),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Derived view of an issue: category, effort, and eligibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The classified issue snapshot
    pub task: Issue,
    pub category: Category,
    pub is_priority_eligible: bool,
    pub has_dependencies: bool,
    pub estimated_days: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
}

impl Classification {
    pub fn key(&self) -> &str {
        &self.task.key
    }

    /// Effort converted to whole working minutes
    pub fn estimated_minutes(&self) -> u32 {
        (self.estimated_days * MINUTES_PER_DAY).round() as u32
    }
}
