//! Approval state machine for plans and decompositions

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::ApprovalError;
use super::io::ApprovalIo;
use crate::domain::{DailyPlan, Issue, PlanModification, SubtaskSpec};
use crate::events::{Event, EventBus};
use crate::report::{render_plan, render_subtasks};

/// Source name attached to events published by the approval flow
pub const EVENT_SOURCE: &str = "approval";

pub const DAILY_PLAN_APPROVAL: &str = "daily_plan";
pub const DECOMPOSITION_APPROVAL: &str = "decomposition";

/// Lifecycle of one approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Presented,
    Approved,
    Rejected,
    Modified,
    Expired,
}

/// Reviewer's final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    Rejected { feedback: Option<String> },
    Modified { modifications: Vec<PlanModification> },
}

impl ApprovalOutcome {
    pub fn state(&self) -> ApprovalState {
        match self {
            Self::Approved => ApprovalState::Approved,
            Self::Rejected { .. } => ApprovalState::Rejected,
            Self::Modified { .. } => ApprovalState::Modified,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Modify,
}

fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(Answer::Yes),
        "no" | "n" => Some(Answer::No),
        "modify" | "m" => Some(Answer::Modify),
        _ => None,
    }
}

/// Parse "remove 0,2" or "reorder 2,0,1"
pub fn parse_modification(line: &str) -> Result<PlanModification, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    let indices = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| format!("'{}' is not a valid index", part))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match command.to_lowercase().as_str() {
        "remove" => {
            let mut indices = indices;
            indices.sort_unstable();
            indices.dedup();
            Ok(PlanModification::Remove { indices })
        }
        "reorder" => Ok(PlanModification::Reorder { order: indices }),
        other => Err(format!("unknown command '{}', use remove or reorder", other)),
    }
}

/// Interactive yes/no/modify review with an optional deadline
#[derive(Clone, Default)]
pub struct ApprovalFlow {
    timeout: Option<Duration>,
    event_bus: Option<Arc<EventBus>>,
}

impl ApprovalFlow {
    /// `None` waits for an answer indefinitely
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            event_bus: None,
        }
    }

    /// Publish `approval_timeout` on this bus when a review expires
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Ask the reviewer to approve, reject or modify `plan`
    pub async fn review_plan<I: ApprovalIo>(&self, io: &mut I, plan: &DailyPlan) -> Result<ApprovalOutcome, ApprovalError> {
        let subject = plan.date.to_string();
        debug!(%subject, "ApprovalFlow::review_plan: called");
        self.with_deadline(DAILY_PLAN_APPROVAL, &subject, plan_conversation(io, plan))
            .await
    }

    /// Ask the reviewer to approve or reject creating `subtasks`
    pub async fn review_decomposition<I: ApprovalIo>(
        &self,
        io: &mut I,
        issue: &Issue,
        subtasks: &[SubtaskSpec],
    ) -> Result<ApprovalOutcome, ApprovalError> {
        debug!(key = %issue.key, count = subtasks.len(), "ApprovalFlow::review_decomposition: called");
        self.with_deadline(
            DECOMPOSITION_APPROVAL,
            &issue.key,
            decomposition_conversation(io, issue, subtasks),
        )
        .await
    }

    async fn with_deadline<F>(&self, approval_type: &str, subject: &str, conversation: F) -> Result<ApprovalOutcome, ApprovalError>
    where
        F: Future<Output = Result<ApprovalOutcome, ApprovalError>>,
    {
        let result = match self.timeout {
            None => conversation.await,
            Some(timeout) => match tokio::time::timeout_at(Instant::now() + timeout, conversation).await {
                Ok(result) => result,
                Err(_) => {
                    let timeout_at = Utc::now();
                    warn!(approval_type, subject, %timeout_at, "Approval expired");
                    if let Some(bus) = &self.event_bus {
                        bus.publish(Event::approval_timeout(EVENT_SOURCE, approval_type, subject, timeout_at))
                            .await;
                    }
                    return Err(ApprovalError::Timeout {
                        approval_type: approval_type.to_string(),
                        subject: subject.to_string(),
                        timeout_at,
                    });
                }
            },
        };

        if let Ok(outcome) = &result {
            info!(approval_type, subject, state = ?outcome.state(), "Approval resolved");
        }
        result
    }
}

async fn next_line<I: ApprovalIo>(io: &mut I) -> Result<String, ApprovalError> {
    io.read_line().await?.ok_or(ApprovalError::InputClosed)
}

async fn read_feedback<I: ApprovalIo>(io: &mut I) -> Result<Option<String>, ApprovalError> {
    io.write("Feedback (optional, press enter to skip):").await?;
    let feedback = io.read_line().await?.unwrap_or_default();
    let feedback = feedback.trim();
    Ok((!feedback.is_empty()).then(|| feedback.to_string()))
}

async fn plan_conversation<I: ApprovalIo>(io: &mut I, plan: &DailyPlan) -> Result<ApprovalOutcome, ApprovalError> {
    io.write(&render_plan(plan)).await?;
    loop {
        io.write("Approve this plan? [yes/no/modify]").await?;
        match parse_answer(&next_line(io).await?) {
            Some(Answer::Yes) => return Ok(ApprovalOutcome::Approved),
            Some(Answer::No) => {
                let feedback = read_feedback(io).await?;
                return Ok(ApprovalOutcome::Rejected { feedback });
            }
            Some(Answer::Modify) => {
                let modifications = collect_modifications(io, plan).await?;
                if !modifications.is_empty() {
                    return Ok(ApprovalOutcome::Modified { modifications });
                }
                io.write("No modifications made.").await?;
            }
            None => io.write("Please answer yes, no or modify.").await?,
        }
    }
}

async fn collect_modifications<I: ApprovalIo>(
    io: &mut I,
    plan: &DailyPlan,
) -> Result<Vec<PlanModification>, ApprovalError> {
    let mut working = plan.clone();
    let mut modifications = Vec::new();

    loop {
        io.write(&priority_listing(&working)).await?;
        io.write("Enter 'remove <i,j,..>' or 'reorder <i,j,..>':").await?;
        let line = next_line(io).await?;
        if line.trim().eq_ignore_ascii_case("done") {
            return Ok(modifications);
        }

        let modification = match parse_modification(&line) {
            Ok(modification) => modification,
            Err(message) => {
                io.write(&format!("Invalid modification: {}", message)).await?;
                continue;
            }
        };
        match working.apply_modifications(std::slice::from_ref(&modification)) {
            Ok(updated) => {
                working = updated;
                modifications.push(modification);
            }
            Err(e) => {
                io.write(&format!("Invalid modification: {}", e)).await?;
                continue;
            }
        }

        loop {
            io.write("Modification accepted. Another? [more/done]").await?;
            match next_line(io).await?.trim().to_lowercase().as_str() {
                "more" => break,
                "done" => return Ok(modifications),
                _ => io.write("Please answer more or done.").await?,
            }
        }
    }
}

fn priority_listing(plan: &DailyPlan) -> String {
    if plan.priorities.is_empty() {
        return "Current priorities: (none)".to_string();
    }
    let lines: Vec<String> = plan
        .priorities
        .iter()
        .enumerate()
        .map(|(i, c)| format!("  [{}] {} {}", i, c.key(), c.task.summary))
        .collect();
    format!("Current priorities:\n{}", lines.join("\n"))
}

async fn decomposition_conversation<I: ApprovalIo>(
    io: &mut I,
    issue: &Issue,
    subtasks: &[SubtaskSpec],
) -> Result<ApprovalOutcome, ApprovalError> {
    io.write(&render_subtasks(issue, subtasks)).await?;
    loop {
        io.write(&format!("Create these {} subtasks? [yes/no]", subtasks.len()))
            .await?;
        match parse_answer(&next_line(io).await?) {
            Some(Answer::Yes) => return Ok(ApprovalOutcome::Approved),
            Some(Answer::No) => {
                let feedback = read_feedback(io).await?;
                return Ok(ApprovalOutcome::Rejected { feedback });
            }
            _ => io.write("Please answer yes or no.").await?,
        }
    }
}
