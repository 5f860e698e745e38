//! Graphviz rendering of relation trees.
//!
//! Produces an undirected `dot` graph with one node per operator, labelled
//! with the usual algebra symbols as HTML-like labels. Nodes are numbered
//! in post-order, so leaves come first.

use quick_xml::escape::escape;

use crate::condition::Condition;
use crate::relation::Relation;

/// Render `relation` as a `dot` graph.
pub fn to_dot(relation: &Relation) -> String {
    let mut nodes = String::new();
    let mut edges = String::new();
    let mut counter = 0usize;

    relation.fold(&mut |node, kids: Vec<String>| {
        let id = format!("node{counter}");
        counter += 1;
        for kid in &kids {
            edges.push_str(&format!("  {id} -- {kid};\n"));
        }
        let line = match node {
            Relation::Variable(vt) => format!("  {id}[shape=circle,label = <{}>];\n", escape(vt.name())),
            _ => format!("  {id}[label = <{}>];\n", label(node)),
        };
        nodes.push_str(&line);
        id
    });

    format!("graph G\n{{\n  node [shape=plaintext];\n{nodes}{edges}}}\n")
}

fn label(node: &Relation) -> String {
    match node {
        Relation::Table(t) => escape(t.name()).into_owned(),
        Relation::Variable(vt) => escape(vt.name()).into_owned(),
        Relation::Selection { condition, .. } => format!("&sigma;<sub>{}</sub>", condition_label(condition)),
        Relation::Projection { schema, .. } => format!("&pi;<sub>{}</sub>", escape(&schema.to_string())),
        Relation::Renaming { renames, .. } => {
            let pairs = renames
                .iter()
                .map(|(from, to)| format!("{}&rarr;{}", escape(&from.to_string()), escape(&to.to_string())))
                .collect::<Vec<_>>()
                .join(",");
            format!("&rho;<sub>{pairs}</sub>")
        }
        Relation::Union(_) => "&cup;".to_string(),
        Relation::Intersection(_) => "&cap;".to_string(),
        Relation::Product(_) => "&times;".to_string(),
        Relation::Join { condition, .. } => format!("&#x22C8;<sub>{}</sub>", condition_label(condition)),
    }
}

fn condition_label(condition: &Condition) -> String {
    condition.fold(&mut |c, kids: Vec<String>| match c {
        Condition::Equality(l, r) => format!("{}={}", escape(&l.to_string()), escape(&r.to_string())),
        Condition::And(_) => kids.join("&land;"),
        Condition::Or(_) => kids.join("&lor;"),
        Condition::Not(_) => format!("&not;({})", kids.concat()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::VariableTable;
    use crate::table::Table;
    use crate::value::{Attribute, Schema, Value};

    #[test]
    fn test_selection_over_table() {
        let t = Table::new("A", Schema::parse("a"));
        let r = Relation::selection(Condition::equals(Attribute::parse("A.a"), Value::from("0")), t);
        assert_eq!(
            to_dot(&r),
            "graph G\n{\n  node [shape=plaintext];\n  node0[label = <A>];\n  \
             node1[label = <&sigma;<sub>A.a=0</sub>>];\n  node1 -- node0;\n}\n"
        );
    }

    #[test]
    fn test_vartable_and_join() {
        let cond = Condition::and(vec![
            Condition::equals(Attribute::parse("A.a"), Attribute::parse("B.a")),
            Condition::equals(Attribute::parse("A.b"), Value::from("<")),
        ]);
        let r = Relation::join(
            cond,
            VariableTable::wrapping("alpha", "S1", Table::new("A", Schema::parse("a,b"))),
            VariableTable::new("B"),
        );
        let dot = to_dot(&r);
        assert!(dot.contains("node1[shape=circle,label = <alpha>];"));
        assert!(dot.contains("node2[shape=circle,label = <B>];"));
        assert!(dot.contains("&#x22C8;<sub>A.a=B.a&land;A.b=&lt;</sub>"));
        assert!(dot.contains("  node3 -- node1;\n  node3 -- node2;\n"));
        assert!(dot.contains("  node1 -- node0;\n"));
    }

    #[test]
    fn test_every_node_and_edge_on_its_own_line() {
        let r = Relation::intersection(vec![VariableTable::new("x").into(), VariableTable::new("y").into()]);
        assert_eq!(
            to_dot(&r),
            "graph G\n{\n  node [shape=plaintext];\n  node0[shape=circle,label = <x>];\n  \
             node1[shape=circle,label = <y>];\n  node2[label = <&cap;>];\n  \
             node2 -- node0;\n  node2 -- node1;\n}\n"
        );
    }

    #[test]
    fn test_nary_operators() {
        let r = Relation::union(vec![
            VariableTable::new("x").into(),
            Relation::product(vec![VariableTable::new("y").into(), VariableTable::new("z").into()]),
        ]);
        let dot = to_dot(&r);
        assert!(dot.contains("node3[label = <&times;>];"));
        assert!(dot.contains("node4[label = <&cup;>];"));
        assert_eq!(dot.matches(" -- ").count(), 4);
    }
}
