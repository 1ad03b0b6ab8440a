//! Common error types for the artifact explorer

use thiserror::Error;

/// Common result type for artifact operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the artifact crates
#[derive(Error, Debug)]
pub enum Error {
    /// Store unreachable, statement rejected or constraint violated (wraps sqlx::Error)
    #[error("Database error: {0}")]
    DataAccess(#[from] sqlx::Error),

    /// Batch rejected before any store mutation
    #[error("Validation error in {table}: {reason}")]
    Validation { table: String, reason: String },

    /// A catalog query failed against the current schema or data
    #[error("Query '{entry}' failed: {message}")]
    QueryExecution { entry: String, message: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Shorthand for a validation failure on one table
    pub fn validation(table: &str, reason: impl Into<String>) -> Self {
        Error::Validation {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
