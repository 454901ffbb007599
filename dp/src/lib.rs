//! dailyplan - task classification and daily plan scheduling
//!
//! Turns the open issues of a tracker into a bounded daily plan: at most
//! three focus tasks that can each be closed in a day, one time-boxed block
//! for administrative work, and decomposition proposals for anything bigger.
//! A background scheduler watches for blockers and re-plans around them.
//!
//! # Modules
//!
//! - [`domain`] - Issues, classifications, plans and closure records
//! - [`classifier`] - Pure issue classification and effort estimation
//! - [`source`] - The `IssueSource` contract with file and memory backends
//! - [`planner`] - Plan generation, re-planning, decomposition and the closure ledger
//! - [`scheduler`] - Background polling and prioritised operation dispatch
//! - [`events`] - Typed event bus and JSONL event logger
//! - [`approval`] - Reviewer approval of plans and decompositions
//! - [`report`] - Plain-text rendering
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod approval;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod planner;
pub mod report;
pub mod scheduler;
pub mod source;

// Re-export commonly used types
pub use approval::{ApprovalError, ApprovalFlow, ApprovalIo, ApprovalOutcome, ApprovalState};
pub use classifier::TaskClassifier;
pub use config::Config;
pub use domain::{
    AdminBlock, Category, Classification, ClosureRecord, DailyPlan, Issue, IssueLink, PlanModification, SubtaskSpec,
};
pub use events::{Event, EventBus, EventHandler, EventPayload, EventType, create_event_bus};
pub use planner::{ClosureLedger, FileClosureLedger, MemoryClosureLedger, PlanError, PlanGenerator, PlannerConfig};
pub use scheduler::{BackgroundScheduler, OperationPriority, OperationReport, SchedulerConfig};
pub use source::{FileIssueSource, IssueSource, MemoryIssueSource, SourceError};
