//! Plain-text rendering of plans and decomposition proposals

use std::fmt::Write;

use crate::domain::{Classification, DailyPlan, Issue, SubtaskSpec};

fn task_line(c: &Classification) -> String {
    format!(
        "{} {} ({}, {:.1}d, {})",
        c.key(),
        c.task.summary,
        c.task.priority,
        c.estimated_days,
        c.task.status
    )
}

/// Render a daily plan for review
///
/// Priorities are listed with the zero-based indices used by the
/// remove and reorder commands.
pub fn render_plan(plan: &DailyPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Daily plan for {}", plan.date);
    if let Some(rate) = plan.previous_closure_rate {
        let _ = writeln!(out, "Previous closure rate: {:.0}%", rate * 100.0);
    }

    let _ = writeln!(out, "\nPriorities:");
    if plan.priorities.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (i, c) in plan.priorities.iter().enumerate() {
        let _ = writeln!(out, "  [{}] {}", i, task_line(c));
        if let Some(reason) = &c.blocking_reason {
            let _ = writeln!(out, "      {}", reason);
        }
    }

    let block = &plan.admin_block;
    let _ = writeln!(
        out,
        "\nAdmin block {} ({} min):",
        block.scheduled_time, block.time_allocation_minutes
    );
    if block.tasks.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for c in &block.tasks {
        let _ = writeln!(out, "  - {} {} ({} min)", c.key(), c.task.summary, c.estimated_minutes());
    }

    if !plan.decomposition_suggestions.is_empty() {
        let _ = writeln!(out, "\nConsider decomposing:");
        for c in &plan.decomposition_suggestions {
            let _ = writeln!(out, "  - {}", task_line(c));
        }
    }

    if !plan.other_tasks.is_empty() {
        let _ = writeln!(out, "\nOther tasks: {}", plan.other_tasks.len());
        for c in &plan.other_tasks {
            let _ = writeln!(out, "  - {} [{}]", task_line(c), c.category);
        }
    }

    out.trim_end().to_string()
}

/// Render a proposed decomposition of `issue`
pub fn render_subtasks(issue: &Issue, subtasks: &[SubtaskSpec]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Proposed subtasks for {} {}:", issue.key, issue.summary);
    for spec in subtasks {
        let _ = writeln!(out, "  {}. {} ({:.2}d)", spec.order, spec.summary, spec.estimated_days);
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TaskClassifier;
    use crate::domain::AdminBlock;
    use chrono::NaiveDate;

    fn plan() -> DailyPlan {
        let classifier = TaskClassifier::new();
        DailyPlan {
            date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
            priorities: vec![
                classifier.classify(&Issue::new("PROJ-1", "Fix login").with_priority("High")),
                classifier.classify(&Issue::new("BLOCK-1", "Prod down").with_priority("Blocker")),
            ],
            admin_block: AdminBlock {
                tasks: vec![classifier.classify(&Issue::new("ADM-1", "Expenses").with_label("admin"))],
                time_allocation_minutes: 240,
                scheduled_time: "14:00-18:00".to_string(),
            },
            other_tasks: Vec::new(),
            previous_closure_rate: Some(0.667),
            decomposition_suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_render_plan() {
        let text = render_plan(&plan());

        assert!(text.starts_with("Daily plan for 2024-05-14"));
        assert!(text.contains("Previous closure rate: 67%"));
        assert!(text.contains("[0] PROJ-1 Fix login (High, 0.5d, To Do)"));
        assert!(text.contains("[1] BLOCK-1"));
        assert!(text.contains("Priority is Blocker"));
        assert!(text.contains("Admin block 14:00-18:00 (240 min):"));
        assert!(text.contains("- ADM-1 Expenses (240 min)"));
        assert!(!text.contains("Other tasks"));
    }

    #[test]
    fn test_render_empty_plan() {
        let mut plan = plan();
        plan.priorities.clear();
        plan.admin_block = AdminBlock::empty("14:00-14:00");
        plan.previous_closure_rate = None;

        let text = render_plan(&plan);
        assert!(!text.contains("closure rate"));
        assert_eq!(text.matches("(none)").count(), 2);
    }

    #[test]
    fn test_render_subtasks() {
        let issue = Issue::new("PROJ-5", "Migration");
        let specs = vec![SubtaskSpec {
            summary: "Migration - Phase 1/2: Design & Implementation".to_string(),
            description: String::new(),
            estimated_days: 0.75,
            order: 1,
        }];
        let text = render_subtasks(&issue, &specs);
        assert!(text.contains("Proposed subtasks for PROJ-5 Migration:"));
        assert!(text.contains("1. Migration - Phase 1/2: Design & Implementation (0.75d)"));
    }
}
