//! Post-order traversal over relation trees.
//!
//! Everything that needs to look at a whole tree (placeholder linking,
//! readiness, tuple counting, the XML and Graphviz writers) goes through
//! [`Relation::fold`] or [`Relation::try_walk_mut`].

use std::collections::HashMap;

use super::Relation;
use crate::execution::{ExecutionError, ExecutionResult};

impl Relation {
    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Relation> {
        match self {
            Relation::Table(_) => Vec::new(),
            Relation::Variable(vt) => vt.relation().into_iter().collect(),
            Relation::Selection { input, .. }
            | Relation::Projection { input, .. }
            | Relation::Renaming { input, .. } => vec![&**input],
            Relation::Union(ops) | Relation::Intersection(ops) | Relation::Product(ops) => ops.iter().collect(),
            Relation::Join { left, right, .. } => vec![&**left, &**right],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Relation> {
        match self {
            Relation::Table(_) => Vec::new(),
            Relation::Variable(vt) => vt.relation_mut().into_iter().collect(),
            Relation::Selection { input, .. }
            | Relation::Projection { input, .. }
            | Relation::Renaming { input, .. } => vec![&mut **input],
            Relation::Union(ops) | Relation::Intersection(ops) | Relation::Product(ops) => {
                ops.iter_mut().collect()
            }
            Relation::Join { left, right, .. } => vec![&mut **left, &mut **right],
        }
    }

    /// Post-order fold: children are folded first, then `f` receives the
    /// node and its children's results in order.
    pub fn fold<T, F>(&self, f: &mut F) -> T
    where
        F: FnMut(&Relation, Vec<T>) -> T,
    {
        let kids = self.children().into_iter().map(|c| c.fold(f)).collect();
        f(self, kids)
    }

    /// Post-order mutable walk. The first error stops the walk.
    pub fn try_walk_mut<E, F>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Relation) -> Result<(), E>,
    {
        for child in self.children_mut() {
            child.try_walk_mut(f)?;
        }
        f(self)
    }

    /// Attach a copy of `tables[name]` under every unresolved placeholder
    /// named `name`. Returns the number of placeholders resolved.
    ///
    /// A placeholder with an empty name cannot be linked and fails the walk.
    pub fn link_tables(&mut self, tables: &HashMap<String, Relation>) -> ExecutionResult<usize> {
        let mut linked = 0;
        self.try_walk_mut(&mut |node| {
            let Relation::Variable(vt) = node else {
                return Ok(());
            };
            if vt.relation().is_some() {
                return Ok(());
            }
            if vt.name().is_empty() {
                return Err(ExecutionError::Traversal(
                    "placeholder without a name cannot be linked".to_owned(),
                ));
            }
            if let Some(r) = tables.get(vt.name()) {
                vt.set_relation(r.clone());
                linked += 1;
            }
            Ok(())
        })?;
        Ok(linked)
    }

    /// True when no placeholder in the tree is still a leaf.
    pub fn is_ready(&self) -> bool {
        self.fold(&mut |node, kids: Vec<bool>| {
            let leaf = matches!(node, Relation::Variable(vt) if vt.is_leaf());
            !leaf && kids.into_iter().all(|k| k)
        })
    }

    /// Names of the placeholders still waiting for data.
    pub fn unresolved(&self) -> Vec<String> {
        self.fold(&mut |node, kids: Vec<Vec<String>>| {
            let mut names: Vec<String> = kids.into_iter().flatten().collect();
            if let Relation::Variable(vt) = node {
                if vt.relation().is_none() {
                    names.push(vt.name().to_owned());
                }
            }
            names
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::VariableTable;
    use crate::table::Table;
    use crate::value::Schema;

    fn registry() -> HashMap<String, Relation> {
        let mut t = Table::new("A", Schema::parse("a"));
        t.put_values(["1"]).unwrap();
        HashMap::from([("A".to_owned(), Relation::from(t))])
    }

    #[test]
    fn test_link_resolves_matching_leaves() {
        let mut q = Relation::union(vec![
            VariableTable::new("A").into(),
            VariableTable::new("A").into(),
            VariableTable::at("missing", "S2").into(),
        ]);
        assert!(!q.is_ready());
        assert_eq!(q.link_tables(&registry()).unwrap(), 2);
        assert!(!q.is_ready());
        assert_eq!(q.unresolved(), vec!["missing".to_owned()]);
    }

    #[test]
    fn test_link_inside_fragment_root() {
        let mut q: Relation = VariableTable::wrapping("alpha", "S2", VariableTable::new("A")).into();
        assert!(!q.is_ready());
        q.link_tables(&registry()).unwrap();
        assert!(q.is_ready());
        assert_eq!(q.tuple_count(), 1);
    }

    #[test]
    fn test_link_leaves_resolved_placeholders_alone() {
        let mut other = Table::new("A", Schema::parse("a"));
        other.put_values(["9"]).unwrap();
        let mut q: Relation = VariableTable::wrapping("A", "", other.clone()).into();
        assert_eq!(q.link_tables(&registry()).unwrap(), 0);
        assert_eq!(q.as_variable().unwrap().relation(), Some(&Relation::from(other)));
    }

    #[test]
    fn test_link_rejects_unnamed_placeholder() {
        let mut q = Relation::product(vec![VariableTable::new("").into(), VariableTable::new("A").into()]);
        let err = q.link_tables(&registry()).unwrap_err();
        assert!(matches!(err, ExecutionError::Traversal(_)));
    }

    #[test]
    fn test_fold_is_post_order() {
        let q = Relation::union(vec![VariableTable::new("x").into(), VariableTable::new("y").into()]);
        let mut seen = Vec::new();
        q.fold(&mut |node, _: Vec<()>| {
            seen.push(match node {
                Relation::Variable(vt) => vt.name().to_owned(),
                _ => "union".to_owned(),
            });
        });
        assert_eq!(seen, ["x", "y", "union"]);
    }

    #[test]
    fn test_table_alone_is_ready() {
        assert!(registry()["A"].is_ready());
    }
}
