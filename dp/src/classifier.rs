//! Task classifier
//!
//! Turns a raw [`Issue`] into a [`Classification`]: category, estimated
//! effort, dependency flag and priority eligibility. Classification is pure
//! and never fails; missing or malformed fields fall back to defaults.

use serde_json::Value;
use tracing::debug;

use crate::domain::{Category, Classification, Issue};

/// Seconds in an 8h working day
const SECONDS_PER_DAY: f64 = 28_800.0;

/// Effort assumed for unestimated work
const DEFAULT_ESTIMATE_DAYS: f64 = 0.5;

/// Tasks above this many days cannot be closed in one day
pub const MAX_PRIORITY_DAYS: f64 = 1.0;

/// Ceiling for any single estimate, one working year
pub const MAX_ESTIMATE_DAYS: f64 = 260.0;

const DEPENDENCY_LINK_TYPES: &[&str] = &["is blocked by", "depends on", "blocked by"];

const DEPENDENCY_FIELD_MARKERS: &[&str] = &["external", "dependency", "blocked"];

const ADMIN_LABELS: &[&str] = &["admin", "administrative", "email", "report", "approval", "meeting", "review"];

const ADMIN_ISSUE_TYPES: &[&str] = &["Administrative Task", "Admin", "Approval", "Review"];

const ADMIN_TYPE_MARKERS: &[&str] = &["admin", "approval", "review"];

/// Stateless classifier; cheap to copy and share
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one issue
    pub fn classify(&self, issue: &Issue) -> Classification {
        let has_dependencies = self.has_dependencies(issue);
        let estimated_days = self.estimate_days(issue);
        let is_administrative = self.is_administrative(issue);
        let is_blocking = self.is_blocking(issue);

        let category = if is_blocking {
            Category::Blocking
        } else if has_dependencies {
            Category::Dependent
        } else if is_administrative {
            Category::Administrative
        } else if estimated_days > MAX_PRIORITY_DAYS {
            Category::LongRunning
        } else {
            Category::PriorityEligible
        };

        let is_priority_eligible =
            !has_dependencies && estimated_days <= MAX_PRIORITY_DAYS && !is_administrative && !is_blocking;

        let blocking_reason = match category {
            Category::Blocking => Some(format!("Priority is {}", issue.priority)),
            Category::Dependent => self.dependency_reason(issue),
            _ => None,
        };

        debug!(
            key = %issue.key,
            %category,
            estimated_days,
            is_priority_eligible,
            "TaskClassifier::classify"
        );

        Classification {
            task: issue.clone(),
            category,
            is_priority_eligible,
            has_dependencies,
            estimated_days,
            blocking_reason,
        }
    }

    /// Classify a batch, preserving input order
    pub fn classify_all(&self, issues: &[Issue]) -> Vec<Classification> {
        issues.iter().map(|issue| self.classify(issue)).collect()
    }

    /// True if the issue waits on another issue or on something external
    pub fn has_dependencies(&self, issue: &Issue) -> bool {
        self.dependency_link(issue).is_some() || self.dependency_field(issue).is_some()
    }

    /// Effort in working days
    pub fn estimate_days(&self, issue: &Issue) -> f64 {
        if let Some(points) = issue.story_points.filter(|p| p.is_finite() && *p > 0.0) {
            // nearest half day
            let days = (points * 0.5 * 2.0).round() / 2.0;
            return days.clamp(0.5, MAX_ESTIMATE_DAYS);
        }

        if let Some(seconds) = issue.time_estimate.filter(|s| *s > 0) {
            // nearest tenth of a day
            let days = (seconds as f64 / SECONDS_PER_DAY * 10.0).round() / 10.0;
            return days.clamp(0.1, MAX_ESTIMATE_DAYS);
        }

        DEFAULT_ESTIMATE_DAYS
    }

    /// True for low-cognitive-load work that belongs in the admin block
    pub fn is_administrative(&self, issue: &Issue) -> bool {
        let admin_label = issue
            .labels
            .iter()
            .any(|label| ADMIN_LABELS.contains(&label.to_lowercase().as_str()));
        if admin_label {
            return true;
        }

        if ADMIN_ISSUE_TYPES.contains(&issue.issue_type.as_str()) {
            return true;
        }

        let issue_type = issue.issue_type.to_lowercase();
        ADMIN_TYPE_MARKERS.iter().any(|marker| issue_type.contains(marker))
    }

    /// True if the issue demands that the current plan be interrupted
    pub fn is_blocking(&self, issue: &Issue) -> bool {
        issue.priority.eq_ignore_ascii_case("blocker")
    }

    fn dependency_link<'a>(&self, issue: &'a Issue) -> Option<&'a crate::domain::IssueLink> {
        issue.issue_links.iter().find(|link| {
            let link_type = link.link_type.to_lowercase();
            DEPENDENCY_LINK_TYPES.iter().any(|marker| link_type.contains(marker))
        })
    }

    fn dependency_field<'a>(&self, issue: &'a Issue) -> Option<&'a str> {
        issue
            .custom_fields
            .iter()
            .find(|(name, value)| {
                let name = name.to_lowercase();
                DEPENDENCY_FIELD_MARKERS.iter().any(|marker| name.contains(marker)) && is_truthy(value)
            })
            .map(|(name, _)| name.as_str())
    }

    fn dependency_reason(&self, issue: &Issue) -> Option<String> {
        if let Some(link) = self.dependency_link(issue) {
            return Some(format!("{} {}", link.link_type, link.target_key));
        }
        self.dependency_field(issue)
            .map(|field| format!("External dependency: {}", field))
    }
}

/// Whether a custom field value counts as "set"
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueLink;
    use serde_json::json;

    fn classifier() -> TaskClassifier {
        TaskClassifier::new()
    }

    #[test]
    fn test_simple_eligible_task() {
        let issue = Issue::new("PROJ-1", "Implement search")
            .with_story_points(1.0)
            .with_status("To Do")
            .with_priority("High");

        let c = classifier().classify(&issue);
        assert_eq!(c.estimated_days, 0.5);
        assert_eq!(c.category, Category::PriorityEligible);
        assert!(c.is_priority_eligible);
        assert!(!c.has_dependencies);
        assert!(c.blocking_reason.is_none());
    }

    #[test]
    fn test_story_point_rounding() {
        let c = classifier();
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_story_points(2.0)), 1.0);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_story_points(3.0)), 1.5);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_story_points(5.0)), 2.5);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_story_points(8.0)), 4.0);
        // tiny estimates never drop to zero
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_story_points(0.2)), 0.5);
    }

    #[test]
    fn test_huge_estimates_are_capped() {
        let c = classifier();
        let points = Issue::new("A-1", "").with_story_points(1e12);
        assert_eq!(c.estimate_days(&points), MAX_ESTIMATE_DAYS);

        let seconds = Issue::new("A-1", "").with_time_estimate(u64::MAX);
        assert_eq!(c.estimate_days(&seconds), MAX_ESTIMATE_DAYS);
    }

    #[test]
    fn test_time_estimate_rounding() {
        let c = classifier();
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_time_estimate(28_800)), 1.0);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_time_estimate(14_400)), 0.5);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_time_estimate(1_800)), 0.1);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_time_estimate(60)), 0.1);
        assert_eq!(c.estimate_days(&Issue::new("A-1", "").with_time_estimate(86_400)), 3.0);
    }

    #[test]
    fn test_story_points_take_precedence() {
        let issue = Issue::new("A-1", "").with_story_points(4.0).with_time_estimate(3_600);
        assert_eq!(classifier().estimate_days(&issue), 2.0);
    }

    #[test]
    fn test_default_estimate() {
        assert_eq!(classifier().estimate_days(&Issue::new("A-1", "")), 0.5);
        let zero = Issue::new("A-1", "").with_story_points(0.0).with_time_estimate(0);
        assert_eq!(classifier().estimate_days(&zero), 0.5);
    }

    #[test]
    fn test_dependency_links() {
        let c = classifier();
        let blocked = Issue::new("A-1", "").with_link(IssueLink::new("Is Blocked By", "B-2"));
        assert!(c.has_dependencies(&blocked));

        let depends = Issue::new("A-1", "").with_link(IssueLink::new("depends on", "B-2"));
        assert!(c.has_dependencies(&depends));

        let relates = Issue::new("A-1", "").with_link(IssueLink::new("relates to", "B-2"));
        assert!(!c.has_dependencies(&relates));
    }

    #[test]
    fn test_dependency_custom_fields() {
        let c = classifier();
        let cases = [
            (json!("waiting on vendor"), true),
            (json!(""), false),
            (json!(["legal"]), true),
            (json!([]), false),
            (json!(true), true),
            (json!(false), false),
            (json!(0), false),
            (json!(2), true),
            (json!(null), false),
        ];
        for (value, expected) in cases {
            let issue = Issue::new("A-1", "").with_custom_field("External Dependency", value.clone());
            assert_eq!(c.has_dependencies(&issue), expected, "value {:?}", value);
        }

        let unrelated = Issue::new("A-1", "").with_custom_field("team", json!("core"));
        assert!(!c.has_dependencies(&unrelated));
    }

    #[test]
    fn test_administrative_detection() {
        let c = classifier();
        assert!(c.is_administrative(&Issue::new("A-1", "").with_label("Email")));
        assert!(c.is_administrative(&Issue::new("A-1", "").with_issue_type("Approval")));
        assert!(c.is_administrative(&Issue::new("A-1", "").with_issue_type("Code Review Request")));
        assert!(c.is_administrative(&Issue::new("A-1", "").with_issue_type("sysadmin chore")));
        assert!(!c.is_administrative(&Issue::new("A-1", "").with_issue_type("Bug").with_label("backend")));
    }

    #[test]
    fn test_category_precedence() {
        let c = classifier();

        let blocker_with_deps = Issue::new("A-1", "")
            .with_priority("BLOCKER")
            .with_link(IssueLink::new("blocked by", "B-1"));
        let result = c.classify(&blocker_with_deps);
        assert_eq!(result.category, Category::Blocking);
        assert_eq!(result.blocking_reason.as_deref(), Some("Priority is BLOCKER"));
        assert!(!result.is_priority_eligible);

        let admin_with_deps = Issue::new("A-2", "")
            .with_label("meeting")
            .with_link(IssueLink::new("depends on", "B-1"));
        let result = c.classify(&admin_with_deps);
        assert_eq!(result.category, Category::Dependent);
        assert_eq!(result.blocking_reason.as_deref(), Some("depends on B-1"));

        let long_admin = Issue::new("A-3", "").with_label("report").with_story_points(8.0);
        assert_eq!(c.classify(&long_admin).category, Category::Administrative);

        let long_task = Issue::new("A-4", "").with_story_points(5.0);
        let result = c.classify(&long_task);
        assert_eq!(result.category, Category::LongRunning);
        assert!(!result.is_priority_eligible);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let issue = Issue::new("A-9", "Mixed")
            .with_label("review")
            .with_time_estimate(7_200)
            .with_custom_field("blocked_reason", json!("waiting"));
        let c = classifier();
        assert_eq!(c.classify(&issue), c.classify(&issue));
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let issues = vec![Issue::new("A-2", ""), Issue::new("A-1", "")];
        let keys: Vec<_> = classifier()
            .classify_all(&issues)
            .iter()
            .map(|c| c.key().to_string())
            .collect();
        assert_eq!(keys, vec!["A-2", "A-1"]);
    }
}
