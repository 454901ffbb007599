//! Approval error types

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("{approval_type} approval for {subject} timed out at {timeout_at}")]
    Timeout {
        approval_type: String,
        subject: String,
        timeout_at: DateTime<Utc>,
    },

    #[error("input closed before an answer was given")]
    InputClosed,

    #[error("approval I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApprovalError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
