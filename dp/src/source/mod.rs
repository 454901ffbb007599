//! Issue sources
//!
//! The planning core only talks to the tracker through [`IssueSource`].
//! Two implementations ship with the crate: a file-backed snapshot for the
//! CLI and an in-memory source for embedding and tests.

mod error;
mod file;
mod memory;

use async_trait::async_trait;

use crate::domain::{Issue, SubtaskSpec};

pub use error::SourceError;
pub use file::FileIssueSource;
pub use memory::MemoryIssueSource;

/// Statuses that mean an issue is no longer outstanding
pub const CLOSED_STATUSES: &[&str] = &["done", "closed", "resolved"];

/// Contract the planning core depends on
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// All outstanding issues assigned to the user
    async fn fetch_active_issues(&self) -> Result<Vec<Issue>, SourceError>;

    /// Outstanding issues marked as blockers
    async fn fetch_blocking_issues(&self) -> Result<Vec<Issue>, SourceError>;

    /// Look up a single issue by key
    async fn get_issue(&self, key: &str) -> Result<Option<Issue>, SourceError>;

    /// Create a subtask under `parent_key`, returning the new key
    async fn create_subtask(&self, parent_key: &str, spec: &SubtaskSpec) -> Result<String, SourceError>;
}

/// Whether a status counts as outstanding work
pub fn is_active_status(status: &str) -> bool {
    !CLOSED_STATUSES.contains(&status.to_lowercase().as_str())
}

/// Whether an issue is an outstanding blocker
pub fn is_blocking_issue(issue: &Issue) -> bool {
    is_active_status(&issue.status) && issue.priority.eq_ignore_ascii_case("blocker")
}

/// Build the issue a subtask spec turns into
pub(crate) fn subtask_issue(key: String, parent: &Issue, spec: &SubtaskSpec) -> Issue {
    let mut issue = Issue::new(key, spec.summary.clone())
        .with_issue_type("Sub-task")
        .with_priority(parent.priority.clone())
        .with_time_estimate((spec.estimated_days * 28_800.0).round() as u64)
        .with_link(crate::domain::IssueLink {
            link_type: "is subtask of".to_string(),
            target_key: parent.key.clone(),
            target_summary: parent.summary.clone(),
        });
    issue.description = spec.description.clone();
    issue.assignee = parent.assignee.clone();
    issue
}

/// Next free key in the parent's project ("PROJ-13" after "PROJ-12")
pub(crate) fn next_key(parent: &Issue, existing: &[Issue]) -> String {
    let project = parent.project();
    let max = existing
        .iter()
        .filter(|issue| issue.project() == project)
        .filter_map(|issue| issue.key.rsplit_once('-').and_then(|(_, n)| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    format!("{}-{}", project, max + 1)
}
