//! Property tests for plan invariants

use std::sync::Arc;

use chrono::NaiveDate;
use dailyplan::classifier::MAX_PRIORITY_DAYS;
use dailyplan::domain::{Category, ClosureRecord, DailyPlan, Issue, IssueLink};
use dailyplan::planner::{MemoryClosureLedger, PlanGenerator, PlannerConfig};
use dailyplan::source::MemoryIssueSource;
use dailyplan::TaskClassifier;
use proptest::prelude::*;

const PRIORITIES: &[&str] = &["Blocker", "Highest", "High", "Medium", "Low", "Lowest"];
const STATUSES: &[&str] = &["To Do", "In Progress", "Done"];
const LABELS: &[&str] = &["admin", "email", "meeting", "backend", "frontend"];

fn issue_strategy() -> impl Strategy<Value = Issue> {
    (
        prop::sample::select(PRIORITIES),
        prop::sample::select(STATUSES),
        prop::option::of(0.0f64..20.0),
        prop::option::of(0u64..200_000),
        prop::option::of(prop::sample::select(LABELS)),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(priority, status, points, seconds, label, linked, external)| {
            let mut issue = Issue::new("TMP-0", "generated")
                .with_priority(priority)
                .with_status(status);
            issue.story_points = points;
            issue.time_estimate = seconds;
            if let Some(label) = label {
                issue = issue.with_label(label);
            }
            if linked {
                issue = issue.with_link(IssueLink::new("is blocked by", "EXT-1"));
            }
            if external {
                issue = issue.with_custom_field("external_dependency", serde_json::json!("vendor"));
            }
            issue
        })
}

fn backlog_strategy() -> impl Strategy<Value = Vec<Issue>> {
    prop::collection::vec(issue_strategy(), 0..30).prop_map(|issues| {
        issues
            .into_iter()
            .enumerate()
            .map(|(i, mut issue)| {
                issue.key = format!("PROJ-{}", i + 1);
                issue
            })
            .collect()
    })
}

fn generate(issues: Vec<Issue>) -> DailyPlan {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let planner = PlanGenerator::new(
        Arc::new(MemoryIssueSource::new(issues)),
        Arc::new(MemoryClosureLedger::new()),
        PlannerConfig::default(),
    );
    let date = NaiveDate::from_ymd_opt(2024, 5, 14).expect("date");
    runtime
        .block_on(planner.generate_daily_plan_for(date, None))
        .expect("plan")
}

proptest! {
    #[test]
    fn plan_has_at_most_three_priorities(issues in backlog_strategy()) {
        let plan = generate(issues);
        prop_assert!(plan.priorities.len() <= 3);
    }

    #[test]
    fn priorities_are_eligible(issues in backlog_strategy()) {
        let plan = generate(issues);
        for p in &plan.priorities {
            prop_assert!(!p.has_dependencies);
            prop_assert!(p.estimated_days <= MAX_PRIORITY_DAYS);
            prop_assert!(!matches!(p.category, Category::Administrative | Category::Blocking));
        }
    }

    #[test]
    fn admin_block_respects_capacity(issues in backlog_strategy()) {
        let classifier = TaskClassifier::new();
        let admin_total: u32 = issues
            .iter()
            .filter(|i| !matches!(i.status.as_str(), "Done"))
            .map(|i| classifier.classify(i))
            .filter(|c| c.category == Category::Administrative)
            .map(|c| c.estimated_minutes())
            .sum();

        let plan = generate(issues);
        let block = &plan.admin_block;
        let selected: u32 = block.tasks.iter().map(|c| c.estimated_minutes()).sum();
        prop_assert!(block.time_allocation_minutes <= 90);
        prop_assert_eq!(block.time_allocation_minutes, selected);
        if admin_total > 90 {
            prop_assert!(selected < admin_total);
        }
    }

    #[test]
    fn classification_is_idempotent(issue in issue_strategy()) {
        let classifier = TaskClassifier::new();
        prop_assert_eq!(classifier.classify(&issue), classifier.classify(&issue));
    }

    #[test]
    fn decomposition_subtasks_fit_in_a_day(points in 2.5f64..60.0) {
        let issue = Issue::new("PROJ-1", "Large").with_story_points(points);
        let source = Arc::new(MemoryIssueSource::new(vec![issue.clone()]));
        let planner = PlanGenerator::new(
            source.clone(),
            Arc::new(MemoryClosureLedger::new()),
            PlannerConfig::default(),
        );

        let specs = planner.propose_decomposition(&issue);
        prop_assert!(specs.len() >= 2);
        for (i, spec) in specs.iter().enumerate() {
            prop_assert!(spec.estimated_days <= MAX_PRIORITY_DAYS);
            prop_assert_eq!(spec.order, i + 1);
        }
        prop_assert_eq!(source.create_calls(), 0);
    }

    #[test]
    fn closure_rate_formula(total in 0usize..20, incomplete in 0usize..25) {
        let incomplete: Vec<String> = (0..incomplete.min(total)).map(|i| format!("PROJ-{}", i)).collect();
        let date = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
        let record = ClosureRecord::new(date, total, incomplete);

        prop_assert!((0.0..=1.0).contains(&record.closure_rate));
        if total == 0 {
            prop_assert_eq!(record.closure_rate, 0.0);
        } else {
            let expected = record.completed_priorities as f64 / total as f64;
            prop_assert_eq!(record.closure_rate, expected);
        }
        prop_assert_eq!(record.completed_priorities + record.incomplete_tasks.len(), total);
    }
}
