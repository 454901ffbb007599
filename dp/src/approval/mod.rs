//! Human approval of plans and decompositions
//!
//! A review moves from Presented to Approved, Rejected or Modified on the
//! reviewer's answer, or to Expired when the deadline passes first.

mod error;
mod flow;
mod io;

pub use error::ApprovalError;
pub use flow::{
    ApprovalFlow, ApprovalOutcome, ApprovalState, DAILY_PLAN_APPROVAL, DECOMPOSITION_APPROVAL, EVENT_SOURCE,
    parse_modification,
};
pub use io::{ApprovalIo, ConsoleIo, ScriptedIo};
