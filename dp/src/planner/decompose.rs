//! Splitting multi-day work into day-sized phases

use crate::classifier::{MAX_ESTIMATE_DAYS, MAX_PRIORITY_DAYS};
use crate::domain::{Issue, SubtaskSpec};

/// Preferred size of one subtask in days
pub const TARGET_SUBTASK_DAYS: f64 = 0.75;

/// Number of subtasks for a task of `days`; 0 when it already fits in a day
///
/// Estimates above [`MAX_ESTIMATE_DAYS`] are treated as the cap.
pub fn subtask_count(days: f64) -> usize {
    if days.is_nan() || days <= MAX_PRIORITY_DAYS {
        return 0;
    }
    let days = days.min(MAX_ESTIMATE_DAYS);
    let mut n = ((days / TARGET_SUBTASK_DAYS).floor() as usize).saturating_add(1).max(2);
    if days / n as f64 > MAX_PRIORITY_DAYS {
        n = (days.floor() as usize).saturating_add(1);
    }
    n
}

/// Name of phase `index` (1-based) out of `total`
pub fn phase_name(index: usize, total: usize) -> String {
    match (index, total) {
        (1, 2) => "Design & Implementation".to_string(),
        (1, _) => "Analysis & Design".to_string(),
        (i, t) if i == t => "Testing & Integration".to_string(),
        (_, 3) => "Implementation".to_string(),
        (i, _) => format!("Implementation (part {})", i - 1),
    }
}

/// Proposed subtasks for `issue` estimated at `days`
pub fn split(issue: &Issue, days: f64) -> Vec<SubtaskSpec> {
    let n = subtask_count(days);
    let days = days.min(MAX_ESTIMATE_DAYS);
    let per_subtask = if n == 0 { 0.0 } else { days / n as f64 };

    (1..=n)
        .map(|order| {
            let phase = phase_name(order, n);
            SubtaskSpec {
                summary: format!("{} - Phase {}/{}: {}", issue.summary, order, n, phase),
                description: format!(
                    "{} for {} ({}). Phase {} of {}, estimated {:.2} days.",
                    phase, issue.key, issue.summary, order, n, per_subtask
                ),
                estimated_days: per_subtask,
                order,
            }
        })
        .collect()
}
