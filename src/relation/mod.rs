//! # Relation Trees
//!
//! A query is a tree of [`Relation`] nodes. Tables own tuples; every other
//! node owns its children and computes its schema and tuples on demand.
//!
//! ## Design
//!
//! - **One closed enum**: operators are variants dispatched by `match`, and
//!   evaluation lives in [`crate::execution::Cursor`]
//! - **Exclusive ownership**: children are `Box`/`Vec` owned. Sharing between
//!   fragments only happens by name through an engine's table registry, which
//!   hands out fresh clones
//! - **Placeholders**: a [`VariableTable`] stands for a relation hosted
//!   elsewhere and doubles as the routing label of a fragment
//!
//! ## Example
//!
//! ```
//! use sitedb::relation::Relation;
//! use sitedb::table::Table;
//! use sitedb::value::Schema;
//!
//! let mut a = Table::new("A", Schema::parse("a"));
//! a.put_values(["0"]).unwrap();
//! a.put_values(["1"]).unwrap();
//! let mut b = Table::new("B", Schema::parse("a"));
//! b.put_values(["1"]).unwrap();
//!
//! let union = Relation::union(vec![a.into(), b.into()]);
//! assert_eq!(union.cardinality().unwrap(), 2);
//! ```

mod traverse;

use std::collections::BTreeMap;
use std::fmt;

use crate::condition::Condition;
use crate::execution::{Cursor, ExecutionResult};
use crate::table::{self, Table};
use crate::value::{Attribute, Schema, Tuple};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    Table(Table),
    Variable(VariableTable),
    Selection {
        condition: Condition,
        input: Box<Relation>,
    },
    Projection {
        schema: Schema,
        input: Box<Relation>,
    },
    Renaming {
        renames: BTreeMap<Attribute, Attribute>,
        input: Box<Relation>,
    },
    Union(Vec<Relation>),
    Intersection(Vec<Relation>),
    Product(Vec<Relation>),
    Join {
        condition: Condition,
        left: Box<Relation>,
        right: Box<Relation>,
    },
}

impl Relation {
    pub fn selection(condition: Condition, input: impl Into<Relation>) -> Self {
        Relation::Selection {
            condition,
            input: Box::new(input.into()),
        }
    }

    pub fn projection(schema: Schema, input: impl Into<Relation>) -> Self {
        Relation::Projection {
            schema,
            input: Box::new(input.into()),
        }
    }

    pub fn renaming(
        renames: impl IntoIterator<Item = (Attribute, Attribute)>,
        input: impl Into<Relation>,
    ) -> Self {
        Relation::Renaming {
            renames: renames.into_iter().collect(),
            input: Box::new(input.into()),
        }
    }

    pub fn union(operands: Vec<Relation>) -> Self {
        Relation::Union(operands)
    }

    pub fn intersection(operands: Vec<Relation>) -> Self {
        Relation::Intersection(operands)
    }

    pub fn product(operands: Vec<Relation>) -> Self {
        Relation::Product(operands)
    }

    pub fn join(condition: Condition, left: impl Into<Relation>, right: impl Into<Relation>) -> Self {
        Relation::Join {
            condition,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
        }
    }

    /// Output schema, computed from the children.
    ///
    /// An unresolved placeholder and an operator with no operands have an
    /// empty schema.
    pub fn schema(&self) -> Schema {
        match self {
            Relation::Table(t) => t.schema().clone(),
            Relation::Variable(vt) => vt.relation().map(Relation::schema).unwrap_or_default(),
            Relation::Selection { input, .. } => input.schema(),
            Relation::Projection { schema, .. } => schema.clone(),
            Relation::Renaming { renames, input } => input
                .schema()
                .iter()
                .map(|a| renames.get(a).unwrap_or(a).clone())
                .collect(),
            Relation::Union(ops) | Relation::Intersection(ops) => {
                ops.first().map(Relation::schema).unwrap_or_default()
            }
            Relation::Product(ops) => {
                let schemas: Vec<Schema> = ops.iter().map(Relation::schema).collect();
                Schema::concat(&schemas)
            }
            Relation::Join { left, right, .. } => Schema::concat([&left.schema(), &right.schema()]),
        }
    }

    pub fn degree(&self) -> usize {
        self.schema().len()
    }

    /// A fragment root carries a destination site and is routed once
    /// evaluated.
    pub fn is_fragment(&self) -> bool {
        matches!(self, Relation::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&VariableTable> {
        match self {
            Relation::Variable(vt) => Some(vt),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Relation::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Number of stored tuples reachable from this node.
    ///
    /// This is the transfer cost of shipping the tree, not its cardinality.
    pub fn tuple_count(&self) -> usize {
        self.fold(&mut |node, kids: Vec<usize>| match node {
            Relation::Table(t) => t.len(),
            _ => kids.into_iter().sum(),
        })
    }

    /// Lazy, duplicate-free enumeration of the relation's tuples.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }

    /// Evaluate into a new table.
    ///
    /// The table takes the qualifier shared by the output schema, if any.
    pub fn materialize(&self) -> ExecutionResult<Table> {
        let schema = self.schema();
        let mut table = Table::new(schema.table_name().unwrap_or_default().to_owned(), schema);
        for tuple in self.cursor() {
            table.put(tuple?)?;
        }
        Ok(table)
    }

    /// Number of distinct tuples.
    pub fn cardinality(&self) -> ExecutionResult<usize> {
        if let Relation::Table(t) = self {
            return Ok(t.len());
        }
        let mut n = 0;
        for tuple in self.cursor() {
            tuple?;
            n += 1;
        }
        Ok(n)
    }

    /// Whether the relation yields exactly `tuple` (attributes included).
    pub fn contains(&self, tuple: &Tuple) -> ExecutionResult<bool> {
        if let Relation::Table(t) = self {
            return Ok(t.contains(tuple));
        }
        for t in self.cursor() {
            if t? == *tuple {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl From<Table> for Relation {
    fn from(t: Table) -> Self {
        Relation::Table(t)
    }
}

impl From<VariableTable> for Relation {
    fn from(vt: VariableTable) -> Self {
        Relation::Variable(vt)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Table(t) => fmt::Display::fmt(t, f),
            Relation::Variable(vt) if vt.relation.is_none() => write!(f, "?{}", vt.name),
            _ => match self.materialize() {
                Ok(t) => table::write_rows(f, &self.schema(), t.iter()),
                Err(e) => write!(f, "<evaluation failed: {e}>"),
            },
        }
    }
}

/// Placeholder for a relation hosted at a named site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableTable {
    name: String,
    site: String,
    relation: Option<Box<Relation>>,
}

impl VariableTable {
    /// Unresolved placeholder referring to a table by name.
    pub fn new(name: impl Into<String>) -> Self {
        VariableTable {
            name: name.into(),
            site: String::new(),
            relation: None,
        }
    }

    /// Unresolved placeholder labelled with a destination site.
    pub fn at(name: impl Into<String>, site: impl Into<String>) -> Self {
        VariableTable {
            site: site.into(),
            ..VariableTable::new(name)
        }
    }

    pub fn wrapping(name: impl Into<String>, site: impl Into<String>, relation: impl Into<Relation>) -> Self {
        VariableTable {
            relation: Some(Box::new(relation.into())),
            ..VariableTable::at(name, site)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn set_site(&mut self, site: impl Into<String>) {
        self.site = site.into();
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_deref()
    }

    pub fn relation_mut(&mut self) -> Option<&mut Relation> {
        self.relation.as_deref_mut()
    }

    pub fn set_relation(&mut self, relation: impl Into<Relation>) {
        self.relation = Some(Box::new(relation.into()));
    }

    pub fn into_relation(self) -> Option<Relation> {
        self.relation.map(|r| *r)
    }

    /// Unresolved, directly or through a chain of placeholders.
    pub fn is_leaf(&self) -> bool {
        match self.relation.as_deref() {
            None => true,
            Some(Relation::Variable(inner)) => inner.is_leaf(),
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn table(name: &str, rows: &[&[&str]]) -> Table {
        let cols = (0..rows.first().map_or(1, |r| r.len()))
            .map(|i| format!("c{i}"))
            .collect::<Vec<_>>()
            .join(",");
        let mut t = Table::new(name, Schema::parse(&cols));
        for r in rows {
            t.put_values(r.iter().copied()).unwrap();
        }
        t
    }

    #[test]
    fn test_leaf_collapses_through_chain() {
        let mut outer = VariableTable::at("x", "S1");
        assert!(outer.is_leaf());
        outer.set_relation(VariableTable::new("y"));
        assert!(outer.is_leaf());
        outer.set_relation(VariableTable::wrapping("y", "", table("T", &[&["1"]])));
        assert!(!outer.is_leaf());
    }

    #[test]
    fn test_every_placeholder_is_fragment() {
        let resolved = Relation::from(VariableTable::wrapping("x", "S", table("T", &[])));
        assert!(resolved.is_fragment());
        assert!(!Relation::from(table("T", &[])).is_fragment());
    }

    #[test]
    fn test_unresolved_placeholder_is_empty() {
        let vt = Relation::from(VariableTable::new("x"));
        assert!(vt.schema().is_empty());
        assert_eq!(vt.cardinality().unwrap(), 0);
        assert_eq!(vt.to_string(), "?x");
    }

    #[test]
    fn test_tuple_count_sums_leaves() {
        let a = table("A", &[&["1"], &["2"]]);
        let b = table("B", &[&["2"]]);
        let u = Relation::union(vec![a.into(), VariableTable::wrapping("b", "", b).into()]);
        assert_eq!(u.tuple_count(), 3);
        assert_eq!(u.cardinality().unwrap(), 2);
    }

    #[test]
    fn test_renaming_schema_keeps_order() {
        let r = Relation::renaming(
            [(Attribute::parse("A.c1"), Attribute::parse("A.z"))],
            table("A", &[&["1", "2"]]),
        );
        assert_eq!(r.schema().to_string(), "A.c0,A.z");
        let t = r.materialize().unwrap();
        assert_eq!(t.get(0).unwrap().get(&Attribute::parse("A.z")), Some(&Value::from("2")));
    }

    #[test]
    fn test_product_schema_is_concatenation() {
        let p = Relation::product(vec![table("A", &[&["1", "2"]]).into(), table("B", &[&["3"]]).into()]);
        assert_eq!(p.schema().to_string(), "A.c0,A.c1,B.c0");
        assert_eq!(p.degree(), 3);
    }

    #[test]
    fn test_contains_is_exact() {
        let a = table("A", &[&["1"]]);
        let sel = Relation::selection(Condition::and(vec![]), a.clone());
        let row = a.get(0).unwrap().clone();
        assert!(sel.contains(&row).unwrap());
        let mut other = row;
        other.set_table("B");
        assert!(!sel.contains(&other).unwrap());
    }

    #[test]
    fn test_materialize_takes_shared_qualifier() {
        let sel = Relation::selection(Condition::and(vec![]), table("A", &[&["1"]]));
        assert_eq!(sel.materialize().unwrap().name(), "A");
        let p = Relation::product(vec![table("A", &[&["1"]]).into(), table("B", &[&["2"]]).into()]);
        assert_eq!(p.materialize().unwrap().name(), "");
    }
}
