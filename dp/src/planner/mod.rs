//! Daily plan generation
//!
//! [`PlanGenerator`] is the entry point. The pure pieces it is built from
//! (ranking, admin packing, decomposition) are exposed for reuse and tests.

mod admin;
mod closure;
mod config;
mod decompose;
mod error;
mod generator;
pub mod ranking;

pub use admin::{AdminPacking, pack_admin_tasks};
pub use closure::{ClosureLedger, FileClosureLedger, MemoryClosureLedger};
pub use config::{MAX_ADMIN_CAPACITY_MINUTES, MAX_PRIORITIES, PlannerConfig};
pub use decompose::{TARGET_SUBTASK_DAYS, phase_name, subtask_count};
pub use error::{LedgerError, PlanError};
pub use generator::{EVENT_SOURCE, PlanGenerator};
