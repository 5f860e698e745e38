//! XML form of relation trees.
//!
//! Every relation is wrapped in an `<operand>` element holding exactly one
//! operator element:
//!
//! ```text
//! <operand>
//!   <union>
//!     <operand>
//!       <vartable><name>alpha</name><site>Site 1</site></vartable>
//!     </operand>
//!     <operand>
//!       <table>
//!         <name>B</name>
//!         <schema><attribute><name>a</name><table>B</table></attribute></schema>
//!         <tuple><B.a>0</B.a></tuple>
//!       </table>
//!     </operand>
//!   </union>
//! </operand>
//! ```
//!
//! Conditions are `<condition>` elements wrapping one of `equals`, `and`,
//! `or` or `not`; the operands of `equals` are `attribute` (with `name` and
//! `table` children) or `value` elements. Element names are matched without
//! regard to ASCII case.
//!
//! Tuple values are written as child elements named after their attribute,
//! so attribute names must themselves be valid XML names.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::{ParseError, ParseResult};
use crate::condition::Condition;
use crate::relation::{Relation, VariableTable};
use crate::table::Table;
use crate::value::{Attribute, Literal, Schema, Tuple, Value};

// ============================================================================
// Writing
// ============================================================================

/// Serialize a relation tree, tuples included.
pub fn to_xml_string(relation: &Relation) -> String {
    let lines = relation.fold(&mut |node, kids: Vec<Vec<String>>| {
        let kids = kids.into_iter().flatten();
        let (tag, mut body) = match node {
            Relation::Table(t) => ("table", table_lines(t)),
            Relation::Variable(vt) => (
                "vartable",
                vec![leaf("name", vt.name()), leaf("site", vt.site())],
            ),
            Relation::Selection { condition, .. } => ("selection", condition_lines(condition)),
            Relation::Projection { schema, .. } => ("projection", schema_lines(schema)),
            Relation::Renaming { renames, .. } => (
                "renaming",
                renames
                    .iter()
                    .flat_map(|(from, to)| {
                        let mut pair = element("from", attribute_lines(from));
                        pair.extend(element("to", attribute_lines(to)));
                        element("rename", pair)
                    })
                    .collect(),
            ),
            Relation::Union(_) => ("union", Vec::new()),
            Relation::Intersection(_) => ("intersection", Vec::new()),
            Relation::Product(_) => ("product", Vec::new()),
            Relation::Join { condition, .. } => ("join", condition_lines(condition)),
        };
        body.extend(kids);
        element("operand", element(tag, body))
    });
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn leaf(tag: &str, text: &str) -> String {
    format!("<{tag}>{}</{tag}>", escape(text))
}

fn element(tag: &str, body: Vec<String>) -> Vec<String> {
    if body.is_empty() {
        return vec![format!("<{tag}/>")];
    }
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("<{tag}>"));
    lines.extend(body.into_iter().map(|l| format!("  {l}")));
    lines.push(format!("</{tag}>"));
    lines
}

fn attribute_lines(a: &Attribute) -> Vec<String> {
    element("attribute", vec![leaf("name", a.name()), leaf("table", a.table())])
}

fn schema_lines(schema: &Schema) -> Vec<String> {
    element("schema", schema.iter().flat_map(attribute_lines).collect())
}

fn table_lines(table: &Table) -> Vec<String> {
    let mut body = Vec::new();
    if !table.name().is_empty() {
        body.push(leaf("name", table.name()));
    }
    body.extend(schema_lines(table.schema()));
    for t in table {
        let cells = t.iter().map(|(a, v)| leaf(&a.to_string(), v.as_str())).collect();
        body.extend(element("tuple", cells));
    }
    body
}

fn condition_lines(condition: &Condition) -> Vec<String> {
    condition.fold(&mut |node, kids: Vec<Vec<String>>| {
        let inner = match node {
            Condition::Equality(l, r) => {
                let mut body = literal_lines(l);
                body.extend(literal_lines(r));
                element("equals", body)
            }
            Condition::And(_) => element("and", kids.concat()),
            Condition::Or(_) => element("or", kids.concat()),
            Condition::Not(_) => element("not", kids.concat()),
        };
        element("condition", inner)
    })
}

fn literal_lines(literal: &Literal) -> Vec<String> {
    match literal {
        Literal::Attribute(a) => attribute_lines(a),
        Literal::Value(v) => vec![leaf("value", v.as_str())],
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Minimal element tree built from the reader's event stream.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name))
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    fn text(&self) -> &str {
        self.text.trim()
    }
}

fn read_document(text: &str) -> ParseResult<Element> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    let xml_error = |e: quick_xml::Error| ParseError::Xml(e.to_string());

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(Element {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..Element::default()
            }),
            Event::Empty(e) => {
                let el = Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unexpected closing tag".to_owned()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Text(t) => {
                let s = t.unescape().map_err(xml_error)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&s);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Xml("unclosed element at end of document".to_owned()));
    }
    root.ok_or_else(|| ParseError::Xml("empty document".to_owned()))
}

/// Decode a relation tree.
///
/// The root is normally an `<operand>`; a bare operator element is accepted
/// too.
pub fn parse(text: &str) -> ParseResult<Relation> {
    let root = read_document(text)?;
    if root.is("operand") {
        parse_operand(&root)
    } else {
        parse_operator(&root)
    }
}

const OPERATORS: [&str; 9] = [
    "table",
    "vartable",
    "selection",
    "projection",
    "renaming",
    "union",
    "intersection",
    "product",
    "join",
];

fn parse_operand(operand: &Element) -> ParseResult<Relation> {
    let op = operand
        .children
        .iter()
        .find(|c| OPERATORS.iter().any(|name| c.is(name)))
        .ok_or_else(|| {
            let found = operand.children.first().map_or("(empty operand)", |c| c.name.as_str());
            ParseError::UnrecognizedElement(found.to_owned())
        })?;
    parse_operator(op)
}

fn required<'a>(e: &'a Element, element: &'static str, parent: &'static str) -> ParseResult<&'a Element> {
    e.child(element).ok_or(ParseError::Missing { element, parent })
}

fn parse_operator(e: &Element) -> ParseResult<Relation> {
    let name = e.name.to_ascii_lowercase();
    match name.as_str() {
        "table" => parse_table(e).map(Relation::Table),
        "vartable" => parse_vartable(e).map(Relation::Variable),
        "selection" => {
            let condition = parse_condition(required(e, "condition", "selection")?)?;
            let input = parse_operand(required(e, "operand", "selection")?)?;
            Ok(Relation::selection(condition, input))
        }
        "projection" => {
            let schema = parse_schema(required(e, "schema", "projection")?)?;
            let input = parse_operand(required(e, "operand", "projection")?)?;
            Ok(Relation::projection(schema, input))
        }
        "renaming" => {
            let renames = e
                .children_named("rename")
                .map(|r| {
                    let from = parse_attribute(required(required(r, "from", "rename")?, "attribute", "from")?)?;
                    let to = parse_attribute(required(required(r, "to", "rename")?, "attribute", "to")?)?;
                    Ok((from, to))
                })
                .collect::<ParseResult<Vec<_>>>()?;
            let input = parse_operand(required(e, "operand", "renaming")?)?;
            Ok(Relation::renaming(renames, input))
        }
        "union" => parse_nary(e, "Union").map(Relation::Union),
        "intersection" => parse_nary(e, "Intersection").map(Relation::Intersection),
        "product" => parse_nary(e, "Product").map(Relation::Product),
        "join" => {
            let condition = parse_condition(required(e, "condition", "join")?)?;
            let mut operands = e
                .children_named("operand")
                .map(parse_operand)
                .collect::<ParseResult<Vec<_>>>()?;
            if operands.len() > 2 {
                return Err(ParseError::TooManyOperands {
                    operator: "Join",
                    allowed: 2,
                });
            }
            if operands.len() < 2 {
                return Err(ParseError::TooFewOperands {
                    operator: "Join",
                    required: 2,
                    found: operands.len(),
                });
            }
            let right = operands.remove(1);
            let left = operands.remove(0);
            Ok(Relation::join(condition, left, right))
        }
        _ => Err(ParseError::UnrecognizedElement(e.name.clone())),
    }
}

fn parse_nary(e: &Element, operator: &'static str) -> ParseResult<Vec<Relation>> {
    let operands = e
        .children_named("operand")
        .map(parse_operand)
        .collect::<ParseResult<Vec<_>>>()?;
    if operands.len() < 2 {
        return Err(ParseError::TooFewOperands {
            operator,
            required: 2,
            found: operands.len(),
        });
    }
    Ok(operands)
}

fn parse_vartable(e: &Element) -> ParseResult<VariableTable> {
    let name = e.child("name").map(Element::text).unwrap_or_default();
    if name.is_empty() {
        return Err(ParseError::EmptyVartableName);
    }
    let site = e.child("site").map(Element::text).unwrap_or_default();
    let mut vt = VariableTable::at(name, site);
    if let Some(operand) = e.child("operand") {
        vt.set_relation(parse_operand(operand)?);
    }
    Ok(vt)
}

fn parse_table(e: &Element) -> ParseResult<Table> {
    let schema = parse_schema(required(e, "schema", "table")?)?;
    let name = e.child("name").map(Element::text).unwrap_or_default();
    let mut table = Table::new(name, schema);
    for t in e.children_named("tuple") {
        table
            .put(parse_tuple(t)?)
            .map_err(|err| ParseError::Invalid(err.to_string()))?;
    }
    Ok(table)
}

fn parse_schema(e: &Element) -> ParseResult<Schema> {
    let schema = e
        .children_named("attribute")
        .map(parse_attribute)
        .collect::<ParseResult<Schema>>()?;
    if schema.is_empty() {
        return Err(ParseError::EmptySchema);
    }
    Ok(schema)
}

/// `<attribute><name>a</name><table>A</table></attribute>`, or the short
/// form `<attribute>A.a</attribute>`.
fn parse_attribute(e: &Element) -> ParseResult<Attribute> {
    let attribute = match e.child("name") {
        Some(name) => Attribute::new(e.child("table").map(Element::text).unwrap_or_default(), name.text()),
        None => Attribute::parse(e.text()),
    };
    if attribute.name().is_empty() {
        return Err(ParseError::EmptyAttributeName);
    }
    Ok(attribute)
}

fn parse_tuple(e: &Element) -> ParseResult<Tuple> {
    if e.children.is_empty() {
        return Err(ParseError::EmptyTuple);
    }
    Ok(Tuple::from_pairs(
        e.children
            .iter()
            .map(|c| (Attribute::parse(&c.name), Value::from(c.text()))),
    ))
}

fn parse_condition(e: &Element) -> ParseResult<Condition> {
    for c in &e.children {
        let name = c.name.to_ascii_lowercase();
        let nested = || {
            c.children_named("condition")
                .map(parse_condition)
                .collect::<ParseResult<Vec<_>>>()
        };
        return match name.as_str() {
            "equals" => parse_equality(c),
            "and" => Ok(Condition::and(nested()?)),
            "or" => Ok(Condition::or(nested()?)),
            "not" => Condition::not_of(nested()?).map_err(|err| ParseError::Invalid(err.to_string())),
            _ => continue,
        };
    }
    let found = e.children.first().map_or("(empty condition)", |c| c.name.as_str());
    Err(ParseError::UnrecognizedElement(found.to_owned()))
}

fn parse_equality(e: &Element) -> ParseResult<Condition> {
    let mut literals = e.children.iter().filter_map(|c| {
        if c.is("attribute") {
            Some(parse_attribute(c).map(Literal::from))
        } else if c.is("value") {
            Some(parse_value(c).map(Literal::from))
        } else {
            None
        }
    });
    let missing = || ParseError::Missing {
        element: "operand",
        parent: "equals",
    };
    let left = literals.next().ok_or_else(missing)??;
    let right = literals.next().ok_or_else(missing)??;
    Ok(Condition::Equality(left, right))
}

fn parse_value(e: &Element) -> ParseResult<Value> {
    if e.text.is_empty() && e.children.is_empty() {
        return Err(ParseError::EmptyValue);
    }
    Ok(Value::from(e.text()))
}
