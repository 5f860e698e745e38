//! Tuples: attribute/value rows positionally aligned with a schema.

use std::cmp::Ordering;
use std::fmt;

use super::{Attribute, Schema, Value};
use crate::execution::{ExecutionError, ExecutionResult};

/// One row of a relation.
///
/// Equality (and hashing) covers both attributes and values. Ordering is a
/// separate notion, see [`Tuple::cmp_values`]: it ignores attributes so that
/// the same row coming from two differently named tables sorts identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tuple {
    attributes: Vec<Attribute>,
    values: Vec<Value>,
}

impl Tuple {
    /// Build a tuple laid out over `schema`.
    pub fn from_schema(schema: &Schema, values: Vec<Value>) -> ExecutionResult<Self> {
        if schema.len() != values.len() {
            return Err(ExecutionError::ArityMismatch {
                expected: schema.len(),
                found: values.len(),
            });
        }
        Ok(Tuple {
            attributes: schema.attributes().to_vec(),
            values,
        })
    }

    /// Build a tuple from `(attribute, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Attribute, Value)>) -> Self {
        let (attributes, values) = pairs.into_iter().unzip();
        Tuple { attributes, values }
    }

    /// Number of attribute/value pairs.
    pub fn degree(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn schema(&self) -> Schema {
        self.attributes.iter().cloned().collect()
    }

    /// Value stored under `attribute`, if the tuple has it.
    pub fn get(&self, attribute: &Attribute) -> Option<&Value> {
        self.attributes
            .iter()
            .position(|a| a == attribute)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, &Value)> {
        self.attributes.iter().zip(&self.values)
    }

    /// Value-only order: a shorter tuple is smaller, equal lengths compare
    /// their value sequences lexicographically.
    pub fn cmp_values(&self, other: &Tuple) -> Ordering {
        self.values
            .len()
            .cmp(&other.values.len())
            .then_with(|| self.values.cmp(&other.values))
    }

    /// Same values relabelled with `schema`'s attributes.
    pub fn with_schema(&self, schema: &Schema) -> ExecutionResult<Self> {
        Tuple::from_schema(schema, self.values.clone())
    }

    /// Restamp the table qualifier of every attribute.
    pub fn set_table(&mut self, table: &str) {
        for a in &mut self.attributes {
            a.set_table(table);
        }
    }

    /// Keep only the columns named by `schema`, in its order.
    pub fn project(&self, schema: &Schema) -> ExecutionResult<Self> {
        let values = schema
            .iter()
            .map(|a| {
                self.get(a)
                    .cloned()
                    .ok_or_else(|| ExecutionError::UnknownAttribute(a.to_string()))
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        Ok(Tuple {
            attributes: schema.attributes().to_vec(),
            values,
        })
    }

    /// Concatenate several tuples into one, in order.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Tuple>) -> Self {
        let mut out = Tuple::default();
        for t in parts {
            out.attributes.extend(t.attributes.iter().cloned());
            out.values.extend(t.values.iter().cloned());
        }
        out
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
