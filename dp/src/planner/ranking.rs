//! Priority ranking of eligible tasks

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Classification;

static KEY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").expect("valid key regex"));

/// Ordinal of a tracker priority name; unknown names rank as Medium
pub fn priority_ordinal(priority: &str) -> u8 {
    match priority.to_lowercase().as_str() {
        "blocker" => 0,
        "highest" => 1,
        "high" => 2,
        "medium" => 3,
        "low" => 4,
        "lowest" => 5,
        _ => 3,
    }
}

/// Numeric suffix of an issue key; keys without one sort last
pub fn key_number(key: &str) -> u64 {
    KEY_NUMBER
        .captures(key)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(u64::MAX)
}

fn in_progress_rank(status: &str) -> u8 {
    if status.eq_ignore_ascii_case("in progress") { 0 } else { 1 }
}

/// Compare two tasks by (in progress, priority, effort, key number)
pub fn compare(a: &Classification, b: &Classification) -> Ordering {
    in_progress_rank(&a.task.status)
        .cmp(&in_progress_rank(&b.task.status))
        .then_with(|| priority_ordinal(&a.task.priority).cmp(&priority_ordinal(&b.task.priority)))
        .then_with(|| a.estimated_days.total_cmp(&b.estimated_days))
        .then_with(|| key_number(a.key()).cmp(&key_number(b.key())))
}

/// Sort tasks best first; ties keep their input order
pub fn rank(mut tasks: Vec<Classification>) -> Vec<Classification> {
    tasks.sort_by(compare);
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TaskClassifier;
    use crate::domain::Issue;

    fn classify(issue: Issue) -> Classification {
        TaskClassifier::new().classify(&issue)
    }

    #[test]
    fn test_priority_ordinal() {
        assert_eq!(priority_ordinal("Blocker"), 0);
        assert_eq!(priority_ordinal("HIGHEST"), 1);
        assert_eq!(priority_ordinal("low"), 4);
        assert_eq!(priority_ordinal("Trivial"), 3);
    }

    #[test]
    fn test_key_number() {
        assert_eq!(key_number("PROJ-42"), 42);
        assert_eq!(key_number("A-007"), 7);
        assert_eq!(key_number("NOKEY"), u64::MAX);
    }

    #[test]
    fn test_in_progress_first() {
        let ranked = rank(vec![
            classify(Issue::new("P-1", "a").with_priority("Highest")),
            classify(Issue::new("P-2", "b").with_priority("Low").with_status("In Progress")),
        ]);
        assert_eq!(ranked[0].key(), "P-2");
    }

    #[test]
    fn test_priority_then_effort_then_key() {
        let ranked = rank(vec![
            classify(Issue::new("P-9", "a").with_priority("Medium").with_story_points(2.0)),
            classify(Issue::new("P-3", "b").with_priority("Medium").with_story_points(1.0)),
            classify(Issue::new("P-10", "c").with_priority("High").with_story_points(2.0)),
            classify(Issue::new("P-2", "d").with_priority("Medium").with_story_points(1.0)),
        ]);
        let keys: Vec<_> = ranked.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["P-10", "P-2", "P-3", "P-9"]);
    }

    #[test]
    fn test_keys_without_number_last() {
        let ranked = rank(vec![
            classify(Issue::new("MISC", "a")),
            classify(Issue::new("P-5", "b")),
        ]);
        assert_eq!(ranked[1].key(), "MISC");
    }
}
