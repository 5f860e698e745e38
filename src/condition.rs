//! Predicates evaluated by selections and joins.

use std::fmt;

use crate::execution::{ExecutionError, ExecutionResult};
use crate::value::{Literal, Tuple, Value};

/// Boolean condition over a single tuple.
///
/// `Not` holds exactly one child; `And`/`Or` hold any number. An empty `And`
/// is true and an empty `Or` is false.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Equality(Literal, Literal),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(left: impl Into<Literal>, right: impl Into<Literal>) -> Self {
        Condition::Equality(left.into(), right.into())
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Negation built from an operand list, as it arrives from a parser.
    ///
    /// Anything but a single operand is rejected.
    pub fn not_of(mut conditions: Vec<Condition>) -> ExecutionResult<Self> {
        if conditions.len() != 1 {
            return Err(ExecutionError::InvalidCondition(format!(
                "negation takes exactly one operand, got {}",
                conditions.len()
            )));
        }
        Ok(Condition::not(conditions.remove(0)))
    }

    pub fn evaluate(&self, tuple: &Tuple) -> ExecutionResult<bool> {
        match self {
            Condition::Equality(left, right) => Ok(resolve(left, tuple)? == resolve(right, tuple)?),
            Condition::And(cs) => {
                for c in cs {
                    if !c.evaluate(tuple)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(cs) => {
                for c in cs {
                    if c.evaluate(tuple)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(c) => Ok(!c.evaluate(tuple)?),
        }
    }

    pub fn children(&self) -> &[Condition] {
        match self {
            Condition::Equality(..) => &[],
            Condition::And(cs) | Condition::Or(cs) => cs,
            Condition::Not(c) => std::slice::from_ref(c.as_ref()),
        }
    }

    /// Post-order fold: `f` sees a node together with its folded children.
    pub fn fold<T, F>(&self, f: &mut F) -> T
    where
        F: FnMut(&Condition, Vec<T>) -> T,
    {
        let children = self.children().iter().map(|c| c.fold(f)).collect();
        f(self, children)
    }
}

fn resolve<'a>(literal: &'a Literal, tuple: &'a Tuple) -> ExecutionResult<&'a Value> {
    match literal {
        Literal::Value(v) => Ok(v),
        Literal::Attribute(a) => tuple
            .get(a)
            .ok_or_else(|| ExecutionError::UnknownAttribute(a.to_string())),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (operator, children) = match self {
            Condition::Equality(l, r) => return write!(f, "{l}={r}"),
            Condition::Not(c) => return write!(f, "!({c})"),
            Condition::And(cs) => ("∧", cs),
            Condition::Or(cs) => ("∨", cs),
        };
        for (i, c) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(operator)?;
            }
            match c {
                Condition::And(_) | Condition::Or(_) => write!(f, "({c})")?,
                _ => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}
