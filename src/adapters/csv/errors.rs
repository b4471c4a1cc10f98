use std::path::PathBuf;

use thiserror::Error;

/// Record-level decode failure.
///
/// Recoverable at line granularity: the bulk loaders log the diagnostic
/// and skip the offending line instead of aborting the whole load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Wrong number of top-level fields on the line
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A required field is blank
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// Publication year does not parse as an integer
    #[error("invalid publication year: {0}")]
    InvalidYear(String),

    /// Genre is outside the closed set of variants
    #[error("unknown genre: {0}")]
    UnknownGenre(String),

    /// The borrowed-books field is structurally unreadable
    #[error("unreadable borrowed-books field: {0}")]
    InvalidLoans(String),
}

/// File-level persistence failure.
///
/// Recoverable at operation granularity: load callers fall back to an
/// empty collection, save callers log and carry on.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Single-record file exists but holds no usable record
    #[error("no record found in {}", .0.display())]
    MissingRecord(PathBuf),

    /// Single-record file holds an unreadable record
    #[error("unreadable record: {0}")]
    Record(#[from] ParseError),
}
