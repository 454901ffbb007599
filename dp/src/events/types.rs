//! Event types published by the planning core
//!
//! Every event shares one envelope (type, timestamp, source) and carries a
//! typed payload:
//! - `PlanGenerated` when a daily plan or re-plan is produced
//! - `TaskBlocked` when the scheduler handles a blocking issue
//! - `ApprovalTimeout` when a review expires unanswered
//! - `Custom` for anything else a component wants to broadcast

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DailyPlan, Issue};

/// Subscription key for the bus
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PlanGenerated,
    TaskBlocked,
    ApprovalTimeout,
    Custom(String),
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlanGenerated => write!(f, "plan_generated"),
            Self::TaskBlocked => write!(f, "task_blocked"),
            Self::ApprovalTimeout => write!(f, "approval_timeout"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "plan_generated" => Self::PlanGenerated,
            "task_blocked" => Self::TaskBlocked,
            "approval_timeout" => Self::ApprovalTimeout,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Event-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    PlanGenerated {
        plan_date: NaiveDate,
        priority_count: usize,
        admin_task_count: usize,
    },
    TaskBlocked {
        task_key: String,
        task_summary: String,
        task_status: String,
        detected_at: DateTime<Utc>,
    },
    ApprovalTimeout {
        approval_type: String,
        subject: String,
        timeout_at: DateTime<Utc>,
    },
    Custom {
        name: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// Envelope delivered to handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    /// Component that published the event
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }

    pub fn plan_generated(source: impl Into<String>, plan: &DailyPlan) -> Self {
        Self::new(
            source,
            EventPayload::PlanGenerated {
                plan_date: plan.date,
                priority_count: plan.priorities.len(),
                admin_task_count: plan.admin_block.tasks.len(),
            },
        )
    }

    pub fn task_blocked(source: impl Into<String>, issue: &Issue) -> Self {
        Self::new(
            source,
            EventPayload::TaskBlocked {
                task_key: issue.key.clone(),
                task_summary: issue.summary.clone(),
                task_status: issue.status.clone(),
                detected_at: Utc::now(),
            },
        )
    }

    pub fn approval_timeout(
        source: impl Into<String>,
        approval_type: impl Into<String>,
        subject: impl Into<String>,
        timeout_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            source,
            EventPayload::ApprovalTimeout {
                approval_type: approval_type.into(),
                subject: subject.into(),
                timeout_at,
            },
        )
    }

    pub fn custom(source: impl Into<String>, name: impl Into<String>, data: serde_json::Value) -> Self {
        Self::new(
            source,
            EventPayload::Custom {
                name: name.into(),
                data,
            },
        )
    }

    pub fn event_type(&self) -> EventType {
        match &self.payload {
            EventPayload::PlanGenerated { .. } => EventType::PlanGenerated,
            EventPayload::TaskBlocked { .. } => EventType::TaskBlocked,
            EventPayload::ApprovalTimeout { .. } => EventType::ApprovalTimeout,
            EventPayload::Custom { name, .. } => EventType::Custom(name.clone()),
        }
    }

    /// Payload fields as a JSON object, without the type tag
    pub fn event_data(&self) -> serde_json::Value {
        if let EventPayload::Custom { data, .. } = &self.payload {
            return data.clone();
        }
        let mut value = serde_json::to_value(&self.payload).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("type");
        }
        value
    }
}
