//! Daily plan and its building blocks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classification::Classification;

/// Time-boxed block of administrative tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminBlock {
    pub tasks: Vec<Classification>,
    /// Sum of the selected tasks' minutes; never exceeds the block capacity
    pub time_allocation_minutes: u32,
    /// Display window, e.g. "14:00-15:30"
    pub scheduled_time: String,
}

impl AdminBlock {
    pub fn empty(scheduled_time: impl Into<String>) -> Self {
        Self {
            tasks: Vec::new(),
            time_allocation_minutes: 0,
            scheduled_time: scheduled_time.into(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tasks.iter().any(|c| c.key() == key)
    }
}

/// A proposed piece of a multi-day task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    pub summary: String,
    pub description: String,
    pub estimated_days: f64,
    /// 1-based position within the decomposition
    pub order: usize,
}

/// A change to the priority list accepted during plan review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanModification {
    /// Drop the priorities at these 0-based indices
    Remove { indices: Vec<usize> },
    /// New order of priorities; a permutation of all indices
    Reorder { order: Vec<usize> },
}

/// Rejected modification input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModificationError {
    #[error("no indices given")]
    Empty,

    #[error("index {index} out of range (plan has {len} priorities)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("reorder must list every index 0..{len} exactly once")]
    NotAPermutation { len: usize },
}

impl PlanModification {
    /// Check the modification against a priority list of `len` entries
    pub fn validate(&self, len: usize) -> Result<(), ModificationError> {
        match self {
            Self::Remove { indices } => {
                if indices.is_empty() {
                    return Err(ModificationError::Empty);
                }
                if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                    return Err(ModificationError::IndexOutOfRange { index, len });
                }
                Ok(())
            }
            Self::Reorder { order } => {
                if order.is_empty() {
                    return Err(ModificationError::Empty);
                }
                if let Some(&index) = order.iter().find(|&&i| i >= len) {
                    return Err(ModificationError::IndexOutOfRange { index, len });
                }
                let mut seen = vec![false; len];
                for &i in order {
                    if seen[i] {
                        return Err(ModificationError::NotAPermutation { len });
                    }
                    seen[i] = true;
                }
                if order.len() != len {
                    return Err(ModificationError::NotAPermutation { len });
                }
                Ok(())
            }
        }
    }
}

/// The bounded plan for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub date: NaiveDate,
    /// At most three focus tasks, best first
    pub priorities: Vec<Classification>,
    pub admin_block: AdminBlock,
    /// Everything not placed elsewhere, for reference
    pub other_tasks: Vec<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_closure_rate: Option<f64>,
    /// Multi-day tasks worth splitting
    #[serde(default)]
    pub decomposition_suggestions: Vec<Classification>,
}

impl DailyPlan {
    pub fn priority_keys(&self) -> Vec<String> {
        self.priorities.iter().map(|c| c.key().to_string()).collect()
    }

    /// Produce a new plan with the review modifications applied in order
    ///
    /// Removed priorities move to `other_tasks`. Each modification is
    /// validated against the priority list as left by the previous one.
    pub fn apply_modifications(&self, modifications: &[PlanModification]) -> Result<DailyPlan, ModificationError> {
        let mut plan = self.clone();
        for modification in modifications {
            modification.validate(plan.priorities.len())?;
            match modification {
                PlanModification::Remove { indices } => {
                    let mut kept = Vec::with_capacity(plan.priorities.len());
                    let mut removed = Vec::new();
                    for (i, classification) in plan.priorities.drain(..).enumerate() {
                        if indices.contains(&i) {
                            removed.push(classification);
                        } else {
                            kept.push(classification);
                        }
                    }
                    plan.priorities = kept;
                    plan.other_tasks.splice(0..0, removed);
                }
                PlanModification::Reorder { order } => {
                    plan.priorities = order.iter().map(|&i| plan.priorities[i].clone()).collect();
                }
            }
        }
        Ok(plan)
    }
}
