//! Common error types for WOPS

use thiserror::Error;

/// Common result type for WOPS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WOPS crates
#[derive(Error, Debug)]
pub enum Error {
    /// Backing spreadsheet store failure (unreachable, rejected, malformed sheet)
    #[error("Store error: {0}")]
    Store(String),

    /// HTTP transport error talking to the spreadsheet API
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested table or document not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result of a lookup-then-mutate operation
///
/// A lookup that finds nothing is a normal, reportable outcome rather than an
/// error: callers turn it into `{ok: false, msg}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Matching row found and mutation persisted
    Applied,
    /// No matching row; nothing written
    NotFound,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Row-level adaptation failure
///
/// Never escalates past the scan that produced it: blank rows are skipped
/// silently, rows missing a required field are skipped with a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("blank row")]
    Blank,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::Store("HTTP 403 forbidden".to_string());
        assert_eq!(err.to_string(), "Store error: HTTP 403 forbidden");

        let err = Error::Config("WOPS_SHEETS_TOKEN is not set".to_string());
        assert!(err.to_string().contains("WOPS_SHEETS_TOKEN"));
    }

    #[test]
    fn test_outcome_is_applied() {
        assert!(Outcome::Applied.is_applied());
        assert!(!Outcome::NotFound.is_applied());
    }

    #[test]
    fn test_row_error_display() {
        assert_eq!(
            RowError::MissingField("cargoId").to_string(),
            "missing required field 'cargoId'"
        );
    }
}
