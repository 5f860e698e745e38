//! Query Execution Module
//!
//! Provides lazy evaluation of relation trees with:
//! - Pull-based cursors, one per tree node
//! - Duplicate suppression per enumeration pass
//! - Sort-merge union/intersection and odometer products
//!
//! Also home of [`ExecutionError`], the error type shared by the evaluator,
//! the engines and the communicators.

mod cursor;

pub use cursor::Cursor;

use crate::protocol::error::ParseError;

/// Execution error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// A tuple's length disagrees with the schema it is laid out over
    #[error("Arity mismatch: expected {expected} values, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// A condition or projection named an attribute the tuple does not carry
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Malformed condition tree
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// A tree walk could not complete
    #[error("Traversal error: {0}")]
    Traversal(String),

    /// Fragment addressed to a site nobody registered
    #[error("Unknown site: {0}")]
    UnknownSite(String),

    /// Shipping a fragment to a remote site failed
    #[error("Transport error for site '{site}': {message}")]
    Transport { site: String, message: String },

    /// The round bound was hit before the plan settled
    #[error("Query did not converge within {rounds} rounds")]
    NonConvergence { rounds: usize },

    /// The plan settled without producing any final result
    #[error("Query reached a fixpoint after {rounds} rounds without a result")]
    NoResult { rounds: usize },

    /// Serialized query could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result type for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;
