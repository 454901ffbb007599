//! File-backed issue source
//!
//! Reads a snapshot of the tracker exported as a JSON or YAML array of
//! issues. The file is re-read on every call so external edits show up on the
//! next poll.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{IssueSource, SourceError, is_active_status, is_blocking_issue, next_key, subtask_issue};
use crate::domain::{Issue, SubtaskSpec};

/// Issue source reading from a local snapshot file
pub struct FileIssueSource {
    path: PathBuf,
    /// Serializes read-modify-write cycles in create_subtask
    write_lock: Mutex<()>,
}

impl FileIssueSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "FileIssueSource::new: called");
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        )
    }

    async fn load(&self) -> Result<Vec<Issue>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let issues: Vec<Issue> = if self.is_yaml() {
            serde_yaml::from_str(&content).map_err(|e| SourceError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| SourceError::Parse(e.to_string()))?
        };
        debug!(path = ?self.path, count = issues.len(), "FileIssueSource::load");
        Ok(issues)
    }

    async fn store(&self, issues: &[Issue]) -> Result<(), SourceError> {
        let content = if self.is_yaml() {
            serde_yaml::to_string(issues).map_err(|e| SourceError::Parse(e.to_string()))?
        } else {
            serde_json::to_string_pretty(issues).map_err(|e| SourceError::Parse(e.to_string()))?
        };
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl IssueSource for FileIssueSource {
    async fn fetch_active_issues(&self) -> Result<Vec<Issue>, SourceError> {
        let issues = self.load().await?;
        Ok(issues.into_iter().filter(|i| is_active_status(&i.status)).collect())
    }

    async fn fetch_blocking_issues(&self) -> Result<Vec<Issue>, SourceError> {
        let issues = self.load().await?;
        Ok(issues.into_iter().filter(is_blocking_issue).collect())
    }

    async fn get_issue(&self, key: &str) -> Result<Option<Issue>, SourceError> {
        let issues = self.load().await?;
        Ok(issues.into_iter().find(|issue| issue.key == key))
    }

    async fn create_subtask(&self, parent_key: &str, spec: &SubtaskSpec) -> Result<String, SourceError> {
        let _guard = self.write_lock.lock().await;
        let mut issues = self.load().await?;
        let parent = issues
            .iter()
            .find(|issue| issue.key == parent_key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(parent_key.to_string()))?;

        let key = next_key(&parent, &issues);
        issues.push(subtask_issue(key.clone(), &parent, spec));
        self.store(&issues).await?;

        info!(%parent_key, %key, "Created subtask in {}", self.path.display());
        Ok(key)
    }
}
