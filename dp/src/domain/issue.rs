//! Issue snapshot as delivered by an issue source

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A link from one issue to another ("is blocked by", "relates to", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLink {
    pub link_type: String,
    pub target_key: String,
    #[serde(default)]
    pub target_summary: String,
}

impl IssueLink {
    pub fn new(link_type: impl Into<String>, target_key: impl Into<String>) -> Self {
        Self {
            link_type: link_type.into(),
            target_key: target_key.into(),
            target_summary: String::new(),
        }
    }
}

/// An outstanding work item from the issue tracker
///
/// Every field except `key` defaults when missing so that partially filled
/// tracker payloads still classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    #[serde(default = "default_priority")]
    pub priority: String,

    #[serde(default = "default_status")]
    pub status: String,

    #[serde(default)]
    pub assignee: Option<String>,

    /// Story points, if the team estimates that way
    #[serde(default)]
    pub story_points: Option<f64>,

    /// Original time estimate in seconds
    #[serde(default)]
    pub time_estimate: Option<u64>,

    #[serde(default)]
    pub labels: BTreeSet<String>,

    #[serde(default)]
    pub issue_links: Vec<IssueLink>,

    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

fn default_status() -> String {
    "To Do".to_string()
}

impl Issue {
    /// Create an issue with defaults for everything but key and summary
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            description: String::new(),
            issue_type: default_issue_type(),
            priority: default_priority(),
            status: default_status(),
            assignee: None,
            story_points: None,
            time_estimate: None,
            labels: BTreeSet::new(),
            issue_links: Vec::new(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_story_points(mut self, points: f64) -> Self {
        self.story_points = Some(points);
        self
    }

    pub fn with_time_estimate(mut self, seconds: u64) -> Self {
        self.time_estimate = Some(seconds);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_link(mut self, link: IssueLink) -> Self {
        self.issue_links.push(link);
        self
    }

    pub fn with_custom_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_fields.insert(name.into(), value);
        self
    }

    /// Project prefix of the key ("PROJ" for "PROJ-12")
    pub fn project(&self) -> &str {
        self.key.rsplit_once('-').map(|(project, _)| project).unwrap_or(&self.key)
    }
}
