//! Daily closure record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How many of a day's priorities were closed by the end of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureRecord {
    pub date: NaiveDate,
    pub total_priorities: usize,
    pub completed_priorities: usize,
    pub closure_rate: f64,
    /// Keys of priorities still active at record time
    pub incomplete_tasks: Vec<String>,
}

impl ClosureRecord {
    /// Build a record; the rate is always `completed / total`, or 0.0 when empty
    pub fn new(date: NaiveDate, total_priorities: usize, incomplete_tasks: Vec<String>) -> Self {
        let completed_priorities = total_priorities.saturating_sub(incomplete_tasks.len());
        Self {
            date,
            total_priorities,
            completed_priorities,
            closure_rate: Self::rate(completed_priorities, total_priorities),
            incomplete_tasks,
        }
    }

    pub fn rate(completed: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (completed.min(total) as f64) / (total as f64)
    }
}
