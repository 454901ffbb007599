//! Planner error types

use thiserror::Error;

use crate::source::SourceError;

/// Closure ledger failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("closure ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode closure record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to persist closure record: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Errors surfaced by the plan generator
///
/// Collaborator errors pass through unchanged; the planner never retries.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
