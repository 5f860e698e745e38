//! # Value Type System
//!
//! Core data model shared by every relation in the engine.
//!
//! ## Design Decisions
//!
//! - **Opaque payloads**: a [`Value`] is an uninterpreted string; ordering is
//!   lexicographic and equality is an exact match
//! - **Qualified names**: an [`Attribute`] is `(table, name)`, where an empty
//!   table means "unqualified"
//! - **One literal type**: conditions compare [`Literal`]s, which are either an
//!   attribute (resolved against a tuple) or a value (taken as-is)
//!
//! ## Usage
//!
//! ```
//! use sitedb::value::{Attribute, Literal, Schema, Tuple, Value};
//!
//! let schema = Schema::parse_qualified("A", "a,b");
//! let tuple = Tuple::from_schema(&schema, vec![Value::from("0"), Value::from("1")]).unwrap();
//!
//! assert_eq!(tuple.get(&Attribute::parse("A.b")), Some(&Value::from("1")));
//! assert!(Literal::from(Attribute::new("", "z")) < Literal::from(Value::from("0")));
//! ```

mod schema;
mod tuple;

pub use schema::Schema;
pub use tuple::Tuple;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An opaque string payload stored in a tuple.
///
/// Reference counted so tuples can be cloned cheaply while they flow through
/// cursors, merge buffers and materialized tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(Arc<str>);

impl Value {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Value(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(Arc::from(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A column name, optionally qualified by the table it belongs to.
///
/// Ordering is lexicographic on `(table, name)`, which the derived impls give
/// us thanks to the field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute {
    table: String,
    name: String,
}

impl Attribute {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Attribute {
            table: table.into(),
            name: name.into(),
        }
    }

    /// An attribute with no table qualifier.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Attribute::new(String::new(), name)
    }

    /// Parse `table.name` or a bare `name`.
    ///
    /// Only the first dot separates the qualifier from the name.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.split_once('.') {
            Some((table, name)) => Attribute::new(table.trim(), name.trim()),
            None => Attribute::unqualified(s),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_qualified(&self) -> bool {
        !self.table.is_empty()
    }

    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Copy of this attribute carrying another table qualifier.
    pub fn with_table(&self, table: &str) -> Self {
        Attribute::new(table, self.name.clone())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.table.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.table, self.name)
        }
    }
}

/// Operand of an equality condition.
///
/// Every attribute sorts before every value; within a kind the kind's own
/// ordering applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Attribute(Attribute),
    Value(Value),
}

impl Literal {
    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Literal::Attribute(a) => Some(a),
            Literal::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Literal::Value(v) => Some(v),
            Literal::Attribute(_) => None,
        }
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Literal::Attribute(a), Literal::Attribute(b)) => a.cmp(b),
            (Literal::Value(a), Literal::Value(b)) => a.cmp(b),
            (Literal::Attribute(_), Literal::Value(_)) => Ordering::Less,
            (Literal::Value(_), Literal::Attribute(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Attribute> for Literal {
    fn from(a: Attribute) -> Self {
        Literal::Attribute(a)
    }
}

impl From<Value> for Literal {
    fn from(v: Value) -> Self {
        Literal::Value(v)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Attribute(a) => fmt::Display::fmt(a, f),
            Literal::Value(v) => fmt::Display::fmt(v, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse_qualified() {
        let a = Attribute::parse("A.a");
        assert_eq!(a.table(), "A");
        assert_eq!(a.name(), "a");
        assert_eq!(a.to_string(), "A.a");
    }

    #[test]
    fn test_attribute_parse_bare() {
        let a = Attribute::parse(" z ");
        assert!(!a.is_qualified());
        assert_eq!(a.to_string(), "z");
    }

    #[test]
    fn test_attribute_ordering_table_first() {
        assert!(Attribute::new("A", "z") < Attribute::new("B", "a"));
        assert!(Attribute::new("A", "a") < Attribute::new("A", "b"));
        assert!(Attribute::unqualified("z") < Attribute::new("A", "a"));
    }

    #[test]
    fn test_value_ordering_is_lexicographic() {
        assert!(Value::from("10") < Value::from("9"));
        assert_eq!(Value::from("x"), Value::from(String::from("x")));
    }

    #[test]
    fn test_literal_attributes_before_values() {
        let attr = Literal::from(Attribute::new("Z", "zz"));
        let value = Literal::from(Value::from(""));
        assert_eq!(attr.cmp(&value), Ordering::Less);
        assert_eq!(value.cmp(&attr), Ordering::Greater);
    }

    #[test]
    fn test_literal_same_kind_falls_through() {
        let a = Literal::from(Attribute::new("A", "a"));
        let b = Literal::from(Attribute::new("A", "b"));
        assert!(a < b);
        let x = Literal::from(Value::from("x"));
        let y = Literal::from(Value::from("y"));
        assert!(x < y);
    }
}
