//! Background scheduler
//!
//! Polls the issue source for blockers, triggers the daily plan at a
//! configured time and runs queued operations with blocking work first.

mod config;
mod core;
mod queue;

pub use config::SchedulerConfig;
pub use core::{
    BLOCKING_TASK_OPERATION, BackgroundScheduler, BlockingTaskHandler, DAILY_PLAN_OPERATION, EVENT_SOURCE, Notifier,
    SchedulerBuilder,
};
pub use queue::{Operation, OperationPriority, OperationQueue, OperationReport, OperationResult, OperationStatus};
