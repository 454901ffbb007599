//! Issue source error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by an issue source
///
/// Retry policy belongs to the source itself; the planning core passes these
/// through unchanged.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Issue not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse issues: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SourceError::NotFound("PROJ-9".to_string());
        assert_eq!(err.to_string(), "Issue not found: PROJ-9");
    }
}
