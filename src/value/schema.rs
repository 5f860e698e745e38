//! Ordered attribute lists shared by a table and its tuples.

use std::fmt;
use std::ops::Index;

use super::Attribute;

/// Positional layout of a relation.
///
/// Attributes are unique; pushing an attribute that is already present is a
/// no-op, so the schema of a tuple and of its table always line up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Schema from a comma-separated list such as `"a, b, A.c"`.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Attribute::parse)
            .collect()
    }

    /// Schema from a comma-separated list, every attribute bearing `table`.
    pub fn parse_qualified(table: &str, list: &str) -> Self {
        Schema::parse(list).with_table(table)
    }

    /// Append an attribute. Returns false if it was already present.
    pub fn push(&mut self, attribute: Attribute) -> bool {
        if self.attributes.contains(&attribute) {
            return false;
        }
        self.attributes.push(attribute);
        true
    }

    /// Concatenation of several schemas, in order.
    ///
    /// Duplicate attributes are kept here: a product of a relation with
    /// itself must still have the sum of both degrees.
    pub fn concat<'a>(schemas: impl IntoIterator<Item = &'a Schema>) -> Self {
        Schema {
            attributes: schemas
                .into_iter()
                .flat_map(|s| s.attributes.iter().cloned())
                .collect(),
        }
    }

    /// Copy of the schema with every attribute re-qualified by `table`.
    pub fn with_table(&self, table: &str) -> Self {
        Schema {
            attributes: self.attributes.iter().map(|a| a.with_table(table)).collect(),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        for a in &mut self.attributes {
            a.set_table(table);
        }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn position(&self, attribute: &Attribute) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.position(attribute).is_some()
    }

    pub fn get(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The table qualifier shared by every attribute, if there is exactly one.
    pub fn table_name(&self) -> Option<&str> {
        let first = self.attributes.first()?.table();
        if first.is_empty() || self.attributes.iter().any(|a| a.table() != first) {
            return None;
        }
        Some(first)
    }
}

impl Index<usize> for Schema {
    type Output = Attribute;

    fn index(&self, i: usize) -> &Attribute {
        &self.attributes[i]
    }
}

impl FromIterator<Attribute> for Schema {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for a in iter {
            schema.push(a);
        }
        schema
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{a}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_skips_empty() {
        let s = Schema::parse(" a , b,,c ");
        assert_eq!(s.len(), 3);
        assert_eq!(s[2], Attribute::unqualified("c"));
    }

    #[test]
    fn test_parse_qualified_stamps_every_attribute() {
        let s = Schema::parse_qualified("A", "a,b,c");
        assert!(s.iter().all(|a| a.table() == "A"));
        assert_eq!(s.table_name(), Some("A"));
        assert_eq!(s.to_string(), "A.a,A.b,A.c");
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut s = Schema::parse("a,b");
        assert!(!s.push(Attribute::unqualified("a")));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_concat_keeps_degree() {
        let a = Schema::parse_qualified("A", "x,y");
        let s = Schema::concat([&a, &a]);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_table_name_mixed_is_none() {
        let s = Schema::parse("A.a,B.b");
        assert_eq!(s.table_name(), None);
        assert_eq!(Schema::parse("a").table_name(), None);
    }
}
