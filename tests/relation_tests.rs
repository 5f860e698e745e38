//! Algebra operators evaluated over CSV-loaded tables.

use sitedb::condition::Condition;
use sitedb::relation::{Relation, VariableTable};
use sitedb::storage::parse_table;
use sitedb::table::Table;
use sitedb::value::{Attribute, Schema, Tuple, Value};
use sitedb::ExecutionError;

const ROWS: &str = "a,b,c\n0,0,0\n1,3,4\n0,1,1\n0,2,3\n1,2,3";

fn table(name: &str) -> Table {
    parse_table(name, ROWS).unwrap()
}

fn attr(s: &str) -> Attribute {
    Attribute::parse(s)
}

fn rows(relation: &Relation) -> Vec<Vec<String>> {
    relation
        .materialize()
        .unwrap()
        .iter()
        .map(|t| t.values().iter().map(|v| v.as_str().to_owned()).collect())
        .collect()
}

#[test]
fn test_table_is_sorted_and_deduplicated() {
    let t = parse_table("A", "a,b\n2,2\n1,9\n2,2\n10,0\n").unwrap();
    assert_eq!(t.len(), 3);
    assert_eq!(rows(&t.into()), [["1", "9"], ["10", "0"], ["2", "2"]]);
}

#[test]
fn test_disjunctive_selection() {
    let sel = Relation::selection(
        Condition::or(vec![
            Condition::equals(attr("A.a"), Value::from("0")),
            Condition::equals(attr("A.c"), Value::from("4")),
        ]),
        table("A"),
    );
    assert_eq!(sel.cardinality().unwrap(), 4);
    assert_eq!(sel.schema(), Schema::parse("A.a,A.b,A.c"));
}

#[test]
fn test_negated_conjunction() {
    let sel = Relation::selection(
        Condition::not(Condition::and(vec![
            Condition::equals(attr("A.a"), Value::from("0")),
            Condition::equals(attr("A.b"), attr("A.c")),
        ])),
        table("A"),
    );
    // Drops 0,0,0 and 0,1,1.
    assert_eq!(rows(&sel), [["0", "2", "3"], ["1", "2", "3"], ["1", "3", "4"]]);
}

#[test]
fn test_projection_removes_duplicates() {
    let pro = Relation::projection(Schema::parse("A.a"), table("A"));
    assert_eq!(rows(&pro), [["0"], ["1"]]);
}

#[test]
fn test_projection_of_unknown_attribute_fails() {
    let pro = Relation::projection(Schema::parse("A.z"), table("A"));
    assert_eq!(
        pro.materialize().unwrap_err(),
        ExecutionError::UnknownAttribute("A.z".to_owned())
    );
}

#[test]
fn test_renaming_changes_schema_not_values() {
    let ren = Relation::renaming([(attr("A.a"), attr("A.z"))], table("A"));
    assert_eq!(ren.schema(), Schema::parse("A.z,A.b,A.c"));
    assert_eq!(ren.cardinality().unwrap(), 5);

    let sel = Relation::selection(Condition::equals(attr("A.z"), Value::from("1")), ren);
    assert_eq!(sel.cardinality().unwrap(), 2);
}

#[test]
fn test_union_compares_values_only() {
    let u = Relation::union(vec![table("A").into(), table("B").into()]);
    assert_eq!(u.cardinality().unwrap(), 5);
    let result = u.materialize().unwrap();
    assert_eq!(result.name(), "A");
    assert_eq!(result.schema(), &Schema::parse("A.a,A.b,A.c"));
}

#[test]
fn test_union_of_disjoint_tables() {
    let other = parse_table("C", "a,b,c\n9,9,9\n0,0,0\n").unwrap();
    let u = Relation::union(vec![table("A").into(), other.into()]);
    assert_eq!(u.cardinality().unwrap(), 6);
}

#[test]
fn test_intersection() {
    let other = parse_table("C", "x,y,z\n9,9,9\n0,0,0\n1,2,3\n").unwrap();
    let i = Relation::intersection(vec![table("A").into(), other.into()]);
    assert_eq!(rows(&i), [["0", "0", "0"], ["1", "2", "3"]]);

    let three = Relation::intersection(vec![table("A").into(), table("B").into(), i]);
    assert_eq!(three.cardinality().unwrap(), 2);
}

#[test]
fn test_product() {
    let p = Relation::product(vec![table("A").into(), table("B").into()]);
    assert_eq!(p.degree(), 6);
    assert_eq!(p.cardinality().unwrap(), 25);

    let wanted = Tuple::from_schema(
        &p.schema(),
        ["1", "3", "4", "0", "0", "0"].into_iter().map(Value::from).collect(),
    )
    .unwrap();
    assert!(p.contains(&wanted).unwrap());
}

#[test]
fn test_product_with_empty_operand_is_empty() {
    let empty = Table::new("E", Schema::parse("e"));
    let p = Relation::product(vec![table("A").into(), empty.into()]);
    assert_eq!(p.cardinality().unwrap(), 0);
}

#[test]
fn test_join_is_filtered_product() {
    let j = Relation::join(Condition::equals(attr("A.a"), attr("B.b")), table("A"), table("B"));
    assert_eq!(j.cardinality().unwrap(), 5);

    let p = Relation::selection(
        Condition::equals(attr("A.a"), attr("B.b")),
        Relation::product(vec![table("A").into(), table("B").into()]),
    );
    assert_eq!(rows(&j), rows(&p));
}

#[test]
fn test_nested_query_through_placeholder() {
    let vt = VariableTable::wrapping("alpha", "Site 2", table("A"));
    let q = Relation::projection(Schema::parse("A.b"), vt);
    assert_eq!(rows(&q), [["0"], ["1"], ["2"], ["3"]]);
}

#[test]
fn test_table_display() {
    let t = parse_table("A", "a,b\n0,1\n").unwrap();
    assert_eq!(t.to_string(), "A.a\tA.b\t\n----------------\n0\t1\t\n");
}

#[test]
fn test_unresolved_placeholder_display() {
    let r = Relation::from(VariableTable::new("beta"));
    assert_eq!(r.to_string(), "?beta");
}
