//! Error types for ClutchDB
//!
//! This module defines all error types used throughout the engine.

use thiserror::Error;

/// The main error type for ClutchDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Parse error: column '{0}' assigned more than once")]
    DuplicateColumn(String),

    #[error("Parse error: {columns} column(s) but {values} value(s)")]
    ArgumentCountMismatch { columns: usize, values: usize },

    // ========== Dispatch Errors ==========
    #[error("Dispatch error: query is empty")]
    EmptyQuery,

    #[error("Dispatch error: unsupported statement type '{0}'")]
    UnsupportedStatementType(String),

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Catalog error: table '{0}' not found")]
    UnknownTable(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    // ========== Lock Errors ==========
    #[error("Lock error: table '{0}' is already locked")]
    TableAlreadyLocked(String),

    #[error("Lock error: timed out waiting for table '{0}'")]
    LockTimeout(String),

    // ========== Storage Errors ==========
    #[error("Storage error: write to '{0}' failed")]
    IoFailure(String),

    #[error("Storage error: corrupted record in '{table}' at line {line}")]
    CorruptedRecord { table: String, line: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

/// Result type alias for ClutchDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownTable("users".to_string());
        assert_eq!(err.to_string(), "Catalog error: table 'users' not found");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Lexer error: unexpected character '@' at position 5"
        );

        let err = Error::TableAlreadyLocked("T".to_string());
        assert_eq!(err.to_string(), "Lock error: table 'T' is already locked");
    }
}
