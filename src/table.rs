//! Concrete tuple storage.
//!
//! A [`Table`] is the only relation that owns tuples. Its rows are kept
//! sorted by [`Tuple::cmp_values`] and unique under that order, which is what
//! the sort-merge operators rely on when they read a table directly.

use std::cmp::Ordering;
use std::fmt;

use crate::execution::{ExecutionError, ExecutionResult};
use crate::value::{Schema, Tuple, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Table {
    name: String,
    schema: Schema,
    tuples: Vec<Tuple>,
}

impl Table {
    /// Empty table. A non-empty `name` becomes the qualifier of every
    /// attribute in `schema`.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        let schema = if name.is_empty() {
            schema
        } else {
            schema.with_table(&name)
        };
        Table {
            name,
            schema,
            tuples: Vec::new(),
        }
    }

    /// Empty table that keeps `schema` exactly as given.
    pub fn unnamed(schema: Schema) -> Self {
        Table::new(String::new(), schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rename the table and restamp the qualifier on its schema and on every
    /// stored tuple.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.schema.set_table(&self.name);
        for t in &mut self.tuples {
            t.set_table(&self.name);
        }
    }

    /// Ordered insert. A tuple whose values are already present is ignored.
    ///
    /// Returns whether the tuple was stored.
    pub fn put(&mut self, mut tuple: Tuple) -> ExecutionResult<bool> {
        if tuple.degree() != self.schema.len() {
            return Err(ExecutionError::ArityMismatch {
                expected: self.schema.len(),
                found: tuple.degree(),
            });
        }
        if !self.name.is_empty() {
            tuple.set_table(&self.name);
        }
        match self.tuples.binary_search_by(|t| t.cmp_values(&tuple)) {
            Ok(_) => Ok(false),
            Err(index) => {
                self.tuples.insert(index, tuple);
                Ok(true)
            }
        }
    }

    /// Insert a row given only its values, laid out over the table schema.
    pub fn put_values<I, V>(&mut self, values: I) -> ExecutionResult<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple = Tuple::from_schema(&self.schema, values.into_iter().map(Into::into).collect())?;
        self.put(tuple)
    }

    pub fn put_all(&mut self, tuples: impl IntoIterator<Item = Tuple>) -> ExecutionResult<()> {
        for t in tuples {
            self.put(t)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Tuple> {
        self.tuples.get(i)
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    /// Exact membership: same values and same attributes.
    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples
            .binary_search_by(|t| t.cmp_values(tuple))
            .is_ok_and(|i| self.tuples[i] == *tuple)
    }

    /// Membership by values only.
    pub fn contains_values(&self, tuple: &Tuple) -> bool {
        self.tuples
            .binary_search_by(|t| t.cmp_values(tuple))
            .is_ok()
    }

    /// Strictly increasing under value order.
    pub fn is_sorted(&self) -> bool {
        self.tuples
            .windows(2)
            .all(|w| w[0].cmp_values(&w[1]) == Ordering::Less)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}

/// Tab-separated header, a dashed rule, then one row per tuple.
pub(crate) fn write_rows<'a>(
    f: &mut fmt::Formatter<'_>,
    schema: &Schema,
    rows: impl IntoIterator<Item = &'a Tuple>,
) -> fmt::Result {
    for a in schema {
        write!(f, "{a}\t")?;
    }
    writeln!(f)?;
    for _ in 0..schema.len() {
        f.write_str("--------")?;
    }
    writeln!(f)?;
    for t in rows {
        for v in t.values() {
            write!(f, "{v}\t")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rows(f, &self.schema, &self.tuples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_a() -> Table {
        let mut t = Table::new("A", Schema::parse("a,b,c"));
        for row in [["0", "0", "0"], ["1", "3", "4"], ["0", "1", "1"], ["0", "2", "3"], ["1", "2", "3"]] {
            t.put_values(row).unwrap();
        }
        t
    }

    #[test]
    fn test_put_keeps_sorted() {
        let t = table_a();
        assert_eq!(t.len(), 5);
        assert!(t.is_sorted());
        assert_eq!(t.get(0).unwrap().to_string(), "0\t0\t0");
        assert_eq!(t.get(4).unwrap().to_string(), "1\t3\t4");
    }

    #[test]
    fn test_put_duplicate_ignored() {
        let mut t = table_a();
        assert!(!t.put_values(["0", "1", "1"]).unwrap());
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn test_put_arity_mismatch() {
        let mut t = table_a();
        let err = t.put_values(["0"]).unwrap_err();
        assert!(matches!(err, ExecutionError::ArityMismatch { expected: 3, found: 1 }));
    }

    #[test]
    fn test_put_restamps_foreign_tuple() {
        let mut b = Table::new("B", Schema::parse("a,b,c"));
        let row = table_a().get(0).unwrap().clone();
        b.put(row).unwrap();
        assert!(b.get(0).unwrap().attributes().iter().all(|a| a.table() == "B"));
    }

    #[test]
    fn test_set_name_restamps_everything() {
        let mut t = table_a();
        t.set_name("Z");
        assert_eq!(t.schema().table_name(), Some("Z"));
        assert!(t.iter().flat_map(Tuple::attributes).all(|a| a.table() == "Z"));
    }

    #[test]
    fn test_contains_is_exact() {
        let t = table_a();
        let row = t.get(1).unwrap().clone();
        assert!(t.contains(&row));
        let mut other = row.clone();
        other.set_table("Q");
        assert!(!t.contains(&other));
        assert!(t.contains_values(&other));
    }

    #[test]
    fn test_display_layout() {
        let mut t = Table::new("T", Schema::parse("x"));
        t.put_values(["7"]).unwrap();
        assert_eq!(t.to_string(), "T.x\t\n--------\n7\t\n");
    }
}
