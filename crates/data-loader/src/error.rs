//! Error types for the data-loader crate.
//!
//! Every variant except the I/O ones describes malformed input: a missing
//! required column, a duplicate identifier, an out-of-range score or a cell
//! that can't be parsed. Loading stops at the first problem found.

use thiserror::Error;

/// Errors that can occur while loading and validating the survey files
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A required header column is absent
    #[error("Missing required column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    /// The same menu appears twice (as a row or as a column)
    #[error("Duplicate menu identifier: {menu}")]
    DuplicateMenu { menu: String },

    /// The same user appears in two rows
    #[error("Duplicate user: {user}")]
    DuplicateUser { user: String },

    /// A preference score outside 1..=4
    #[error("Score {score} for user '{user}' and menu '{menu}' is outside 1..=4")]
    ScoreOutOfRange {
        user: String,
        menu: String,
        score: i64,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Attribute column whose prefix is not one of the known categories
    #[error("Attribute column '{column}' does not belong to a known category")]
    UnknownAttributeCategory { column: String },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Correlation matrix headers don't describe a square, labelled matrix
    #[error("Malformed correlation matrix: {0}")]
    MatrixShape(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
