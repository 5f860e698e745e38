//! Pull-based evaluation of relation trees.
//!
//! ## Design
//!
//! A [`Cursor`] is built per evaluation pass by mirroring the relation tree:
//! every node gets a `Source` that knows how to produce its next raw tuple,
//! and a shared outer layer adds the one-tuple lookahead and the set of
//! tuples already emitted in this pass.
//!
//! Union and intersection merge value-ordered runs. Each operand is drained
//! into a sorted, value-unique run the first time the merge is pulled, so the
//! merge never depends on how a child happens to order its output. Products
//! (and joins, which are filtered products) stream tuple-at-a-time through an
//! odometer over the operand cursors.

use std::collections::HashSet;

use crate::condition::Condition;
use crate::relation::Relation;
use crate::table::Table;
use crate::value::{Schema, Tuple};

use super::ExecutionResult;

/// Restartable, duplicate-free enumeration of a relation.
pub struct Cursor<'a> {
    source: Source<'a>,
    /// `None` for tables, whose storage is already unique.
    emitted: Option<HashSet<Tuple>>,
    lookahead: Option<Tuple>,
}

impl<'a> Cursor<'a> {
    pub fn new(relation: &'a Relation) -> Self {
        let source = match relation {
            Relation::Table(table) => {
                return Cursor {
                    source: Source::Table { table, position: 0 },
                    emitted: None,
                    lookahead: None,
                }
            }
            Relation::Variable(vt) => match vt.relation() {
                Some(r) => Source::Variable(Box::new(Cursor::new(r))),
                None => Source::Empty,
            },
            Relation::Selection { condition, input } => Source::Selection {
                condition,
                input: Box::new(Cursor::new(input)),
            },
            Relation::Projection { schema, input } => Source::Projection {
                schema,
                input: Box::new(Cursor::new(input)),
            },
            Relation::Renaming { input, .. } => Source::Renaming {
                schema: relation.schema(),
                input: Box::new(Cursor::new(input)),
            },
            Relation::Union(ops) => Source::Union(Merge::new(relation.schema(), ops)),
            Relation::Intersection(ops) => Source::Intersection(Merge::new(relation.schema(), ops)),
            Relation::Product(ops) => Source::Product(Odometer::new(ops.iter())),
            Relation::Join {
                condition,
                left,
                right,
            } => Source::Join {
                condition,
                product: Odometer::new([&**left, &**right]),
            },
        };
        Cursor {
            source,
            emitted: Some(HashSet::new()),
            lookahead: None,
        }
    }

    /// Next tuple of this pass, or `None` once the relation is exhausted.
    pub fn next_tuple(&mut self) -> ExecutionResult<Option<Tuple>> {
        if let Some(t) = self.lookahead.take() {
            return Ok(Some(t));
        }
        self.pull()
    }

    /// Whether another tuple is available. Repeated calls do not advance.
    pub fn has_next(&mut self) -> ExecutionResult<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.pull()?;
        }
        Ok(self.lookahead.is_some())
    }

    /// Restart the enumeration from the first tuple.
    pub fn reset(&mut self) {
        if let Some(seen) = &mut self.emitted {
            seen.clear();
        }
        self.lookahead = None;
        self.source.reset();
    }

    fn pull(&mut self) -> ExecutionResult<Option<Tuple>> {
        loop {
            let Some(t) = self.source.advance()? else {
                return Ok(None);
            };
            match &mut self.emitted {
                None => return Ok(Some(t)),
                Some(seen) => {
                    if seen.insert(t.clone()) {
                        return Ok(Some(t));
                    }
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = ExecutionResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple().transpose()
    }
}

enum Source<'a> {
    Empty,
    Table {
        table: &'a Table,
        position: usize,
    },
    Variable(Box<Cursor<'a>>),
    Selection {
        condition: &'a Condition,
        input: Box<Cursor<'a>>,
    },
    Projection {
        schema: &'a Schema,
        input: Box<Cursor<'a>>,
    },
    Renaming {
        schema: Schema,
        input: Box<Cursor<'a>>,
    },
    Union(Merge<'a>),
    Intersection(Merge<'a>),
    Product(Odometer<'a>),
    Join {
        condition: &'a Condition,
        product: Odometer<'a>,
    },
}

impl Source<'_> {
    /// Raw next tuple, possibly one already emitted.
    fn advance(&mut self) -> ExecutionResult<Option<Tuple>> {
        match self {
            Source::Empty => Ok(None),
            Source::Table { table, position } => {
                let t = table.get(*position).cloned();
                if t.is_some() {
                    *position += 1;
                }
                Ok(t)
            }
            Source::Variable(input) => input.next_tuple(),
            Source::Selection { condition, input } => {
                while let Some(t) = input.next_tuple()? {
                    if condition.evaluate(&t)? {
                        return Ok(Some(t));
                    }
                }
                Ok(None)
            }
            Source::Projection { schema, input } => input.next_tuple()?.map(|t| t.project(schema)).transpose(),
            Source::Renaming { schema, input } => input.next_tuple()?.map(|t| t.with_schema(schema)).transpose(),
            Source::Union(merge) => merge.union_step(),
            Source::Intersection(merge) => merge.intersection_step(),
            Source::Product(product) => product.advance(),
            Source::Join { condition, product } => {
                while let Some(t) = product.advance()? {
                    if condition.evaluate(&t)? {
                        return Ok(Some(t));
                    }
                }
                Ok(None)
            }
        }
    }

    fn reset(&mut self) {
        match self {
            Source::Empty => {}
            Source::Table { position, .. } => *position = 0,
            Source::Variable(input)
            | Source::Selection { input, .. }
            | Source::Projection { input, .. }
            | Source::Renaming { input, .. } => input.reset(),
            Source::Union(merge) | Source::Intersection(merge) => merge.reset(),
            Source::Product(product) | Source::Join { product, .. } => product.reset(),
        }
    }
}

/// Sort-merge over value-ordered operand runs.
struct Merge<'a> {
    /// Every emitted tuple is relabelled with the first operand's schema.
    schema: Schema,
    operands: Vec<Cursor<'a>>,
    runs: Vec<Vec<Tuple>>,
    positions: Vec<usize>,
    loaded: bool,
}

impl<'a> Merge<'a> {
    fn new(schema: Schema, operands: &'a [Relation]) -> Self {
        Merge {
            schema,
            operands: operands.iter().map(Cursor::new).collect(),
            runs: Vec::new(),
            positions: Vec::new(),
            loaded: false,
        }
    }

    fn load(&mut self) -> ExecutionResult<()> {
        if self.loaded {
            return Ok(());
        }
        self.runs.clear();
        for op in &mut self.operands {
            let mut run = Vec::new();
            while let Some(t) = op.next_tuple()? {
                run.push(t);
            }
            run.sort_by(Tuple::cmp_values);
            run.dedup_by(|a, b| a.cmp_values(b).is_eq());
            self.runs.push(run);
        }
        self.positions = vec![0; self.runs.len()];
        self.loaded = true;
        Ok(())
    }

    /// Emit the smallest head across all operands and advance only that one.
    fn union_step(&mut self) -> ExecutionResult<Option<Tuple>> {
        self.load()?;
        let smallest = self
            .runs
            .iter()
            .zip(&self.positions)
            .enumerate()
            .filter_map(|(i, (run, &p))| run.get(p).map(|t| (i, t)))
            .min_by(|(_, a), (_, b)| a.cmp_values(b));
        let Some((i, head)) = smallest else {
            return Ok(None);
        };
        let out = head.with_schema(&self.schema)?;
        self.positions[i] += 1;
        Ok(Some(out))
    }

    /// Emit when every head agrees, otherwise advance the smallest and retry.
    fn intersection_step(&mut self) -> ExecutionResult<Option<Tuple>> {
        self.load()?;
        if self.runs.is_empty() {
            return Ok(None);
        }
        loop {
            let heads: Option<Vec<&Tuple>> = self
                .runs
                .iter()
                .zip(&self.positions)
                .map(|(run, &p)| run.get(p))
                .collect();
            let Some(heads) = heads else {
                return Ok(None);
            };
            let first = heads[0];
            if heads.iter().all(|h| h.cmp_values(first).is_eq()) {
                let out = first.with_schema(&self.schema)?;
                for p in &mut self.positions {
                    *p += 1;
                }
                return Ok(Some(out));
            }
            let smallest = heads
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.cmp_values(b))
                .map_or(0, |(i, _)| i);
            self.positions[smallest] += 1;
        }
    }

    fn reset(&mut self) {
        self.loaded = false;
        self.runs.clear();
        self.positions.clear();
        for op in &mut self.operands {
            op.reset();
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Progress {
    Fresh,
    Running,
    Done,
}

/// Odometer enumeration of a Cartesian product.
///
/// The rightmost operand turns fastest. When an operand runs out it is reset
/// and the carry moves one position to the left; the product ends when the
/// leftmost operand runs out.
struct Odometer<'a> {
    operands: Vec<Cursor<'a>>,
    current: Vec<Tuple>,
    progress: Progress,
}

impl<'a> Odometer<'a> {
    fn new(operands: impl IntoIterator<Item = &'a Relation>) -> Self {
        Odometer {
            operands: operands.into_iter().map(Cursor::new).collect(),
            current: Vec::new(),
            progress: Progress::Fresh,
        }
    }

    fn advance(&mut self) -> ExecutionResult<Option<Tuple>> {
        match self.progress {
            Progress::Done => Ok(None),
            Progress::Fresh => {
                self.current.clear();
                if self.operands.is_empty() {
                    self.progress = Progress::Done;
                    return Ok(None);
                }
                for op in &mut self.operands {
                    match op.next_tuple()? {
                        Some(t) => self.current.push(t),
                        None => {
                            self.progress = Progress::Done;
                            return Ok(None);
                        }
                    }
                }
                self.progress = Progress::Running;
                Ok(Some(Tuple::concat(&self.current)))
            }
            Progress::Running => {
                let mut i = self.operands.len() - 1;
                loop {
                    if let Some(t) = self.operands[i].next_tuple()? {
                        self.current[i] = t;
                        return Ok(Some(Tuple::concat(&self.current)));
                    }
                    if i == 0 {
                        self.progress = Progress::Done;
                        return Ok(None);
                    }
                    self.operands[i].reset();
                    match self.operands[i].next_tuple()? {
                        Some(t) => self.current[i] = t,
                        None => {
                            self.progress = Progress::Done;
                            return Ok(None);
                        }
                    }
                    i -= 1;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.progress = Progress::Fresh;
        self.current.clear();
        for op in &mut self.operands {
            op.reset();
        }
    }
}
