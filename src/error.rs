//! Error types for offer book reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//! Only malformed input is fatal; every book-level anomaly (duplicate
//! identifier, delete of an unknown offer, unknown order kind) is recorded as
//! a warning instead.

use thiserror::Error;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, ReconError>;

/// Main error type for reconstruction operations.
#[derive(Error, Debug)]
pub enum ReconError {
    /// A row is missing a required field or carries an unparseable value.
    #[error("Malformed record at row {row}: field `{field}` {reason}")]
    MalformedRecord {
        /// Zero-based data row position in the source
        row: usize,
        /// Column name of the offending field
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// A required column is absent from the input header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Events were handed to the engine out of original file order
    #[error("Event out of order: row {row} follows row {previous}")]
    OutOfOrder { previous: usize, row: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O failure while reading or writing a batch
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding or encoding failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (config or warning export) failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl ReconError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        ReconError::Generic(msg.into())
    }

    /// Create a malformed-record error.
    pub fn malformed(row: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconError::MalformedRecord {
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error came from bad upstream input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ReconError::MalformedRecord { .. }
                | ReconError::MissingColumn(_)
                | ReconError::OutOfOrder { .. }
        )
    }
}

impl From<String> for ReconError {
    fn from(err: String) -> Self {
        ReconError::Generic(err)
    }
}

impl From<&str> for ReconError {
    fn from(err: &str) -> Self {
        ReconError::Generic(err.to_string())
    }
}
