//! In-memory issue source

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{IssueSource, SourceError, is_active_status, is_blocking_issue, next_key, subtask_issue};
use crate::domain::{Issue, SubtaskSpec};

/// Issue source backed by a vector in memory
///
/// Useful for embedding the planner and for tests: issues can be added or
/// closed at any time, and the source can be told to fail until recovered.
#[derive(Debug, Default)]
pub struct MemoryIssueSource {
    issues: Mutex<Vec<Issue>>,
    failure: Mutex<Option<String>>,
    fetch_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MemoryIssueSource {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Default::default()
        }
    }

    pub fn add_issue(&self, issue: Issue) {
        self.lock_issues().push(issue);
    }

    /// Mark an issue as done; returns false if the key is unknown
    pub fn close_issue(&self, key: &str) -> bool {
        let mut issues = self.lock_issues();
        match issues.iter_mut().find(|issue| issue.key == key) {
            Some(issue) => {
                issue.status = "Done".to_string();
                true
            }
            None => false,
        }
    }

    /// Drop an issue from the tracker entirely
    pub fn remove_issue(&self, key: &str) -> bool {
        let mut issues = self.lock_issues();
        let before = issues.len();
        issues.retain(|issue| issue.key != key);
        issues.len() != before
    }

    /// Make every call fail with a connection error until [`recover`](Self::recover)
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Number of fetch calls (active or blocking) served so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of create_subtask calls served so far
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.lock_issues().clone()
    }

    fn lock_issues(&self) -> std::sync::MutexGuard<'_, Vec<Issue>> {
        self.issues.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self) -> Result<(), SourceError> {
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(message) => Err(SourceError::Connection(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IssueSource for MemoryIssueSource {
    async fn fetch_active_issues(&self) -> Result<Vec<Issue>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let active: Vec<Issue> = self
            .lock_issues()
            .iter()
            .filter(|issue| is_active_status(&issue.status))
            .cloned()
            .collect();
        debug!(count = active.len(), "MemoryIssueSource::fetch_active_issues");
        Ok(active)
    }

    async fn fetch_blocking_issues(&self) -> Result<Vec<Issue>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.lock_issues().iter().filter(|i| is_blocking_issue(i)).cloned().collect())
    }

    async fn get_issue(&self, key: &str) -> Result<Option<Issue>, SourceError> {
        self.check_failure()?;
        Ok(self.lock_issues().iter().find(|issue| issue.key == key).cloned())
    }

    async fn create_subtask(&self, parent_key: &str, spec: &SubtaskSpec) -> Result<String, SourceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut issues = self.lock_issues();
        let parent = issues
            .iter()
            .find(|issue| issue.key == parent_key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(parent_key.to_string()))?;
        let key = next_key(&parent, &issues);
        issues.push(subtask_issue(key.clone(), &parent, spec));
        debug!(%parent_key, %key, "MemoryIssueSource::create_subtask");
        Ok(key)
    }
}
