//! Storage Error Types

use std::io;
use thiserror::Error;

use crate::execution::ExecutionError;

/// Errors loading or saving hosted relations
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed file content
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rows that do not fit the table they are loaded into
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
