//! Domain types for dailyplan
//!
//! Issues are immutable snapshots produced by an issue source. Everything
//! else (classifications, plans, closure records) is derived from them.

mod classification;
mod closure;
mod issue;
mod plan;

pub use classification::{Category, Classification, MINUTES_PER_DAY};
pub use closure::ClosureRecord;
pub use issue::{Issue, IssueLink};
pub use plan::{AdminBlock, DailyPlan, ModificationError, PlanModification, SubtaskSpec};
