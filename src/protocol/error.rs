//! Error types for decoding serialized query trees.

/// Failure to turn an XML document into a relation tree.
///
/// The decoder either returns a complete tree or one of these; callers never
/// see a partially built relation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The document is not well-formed XML
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// An element that names no known operator or condition
    #[error("Unrecognized element: {0}")]
    UnrecognizedElement(String),

    /// A required sub-element is absent
    #[error("Missing {element} in {parent}")]
    Missing {
        element: &'static str,
        parent: &'static str,
    },

    #[error("Empty schema")]
    EmptySchema,

    #[error("Empty tuple")]
    EmptyTuple,

    #[error("Empty attribute name")]
    EmptyAttributeName,

    #[error("Empty vartable name")]
    EmptyVartableName,

    #[error("Empty value")]
    EmptyValue,

    /// An n-ary operator with fewer operands than it needs
    #[error("{operator} of less than {required} relations (found {found})")]
    TooFewOperands {
        operator: &'static str,
        required: usize,
        found: usize,
    },

    /// A join with more than two operands
    #[error("{operator} of more than {allowed} relations")]
    TooManyOperands { operator: &'static str, allowed: usize },

    /// Well-formed but semantically invalid content, e.g. a tuple whose
    /// arity disagrees with its table's schema
    #[error("Invalid content: {0}")]
    Invalid(String),
}

/// Result type for decoding operations
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::Missing {
            element: "condition",
            parent: "selection",
        };
        assert_eq!(err.to_string(), "Missing condition in selection");

        let err = ParseError::TooFewOperands {
            operator: "Union",
            required: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "Union of less than 2 relations (found 1)");
    }
}
