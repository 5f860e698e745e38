//! # Distributed Coordination
//!
//! Routes query fragments between sites and drives them to completion.
//!
//! ## Design
//!
//! - A [`QueryPlan`] says which fragments start at which site
//! - A [`Communicator`] turns a plan into a [`QueryProcessor`]; how fragments
//!   travel is up to the implementation
//! - [`CentralizedCommunicator`] runs every site in-process and loops rounds
//!   until nothing moves or the round bound is hit
//! - [`HttpCommunicator`] pushes the initial fragments to remote sites over a
//!   [`Transport`]; the sites take it from there
//!
//! ## Example
//!
//! ```
//! use sitedb::distributed::{CentralizedCommunicator, QueryPlan, QueryProcessor};
//! use sitedb::engine::Engine;
//! use sitedb::relation::{Relation, VariableTable};
//! use sitedb::table::Table;
//! use sitedb::value::Schema;
//!
//! let mut a = Table::new("A", Schema::parse("a"));
//! a.put_values(["1"]).unwrap();
//! let mut site = Engine::new("Site 1");
//! site.put_relation("A", a);
//!
//! let comm = CentralizedCommunicator::new(100);
//! comm.add_site(site);
//!
//! let mut plan = QueryPlan::new();
//! plan.add("Site 1", Relation::projection(Schema::parse("A.a"), VariableTable::new("A")));
//!
//! let mut qp = comm.query_processor(plan);
//! qp.run().unwrap();
//! assert_eq!(qp.result().unwrap().cardinality().unwrap(), 1);
//! ```

mod centralized;
mod http;

pub use centralized::{CentralizedCommunicator, CentralizedQueryProcessor};
pub use http::{HttpCommunicator, HttpQueryProcessor, HttpTransport, Transport};

use std::collections::BTreeMap;

use crate::execution::ExecutionResult;
use crate::relation::Relation;

/// Fragments to deliver, keyed by site name.
///
/// Each site's list holds structurally distinct fragments; adding one that
/// is already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    fragments: BTreeMap<String, Vec<Relation>>,
}

impl QueryPlan {
    pub fn new() -> Self {
        QueryPlan::default()
    }

    /// Schedule `fragment` for `site`. Returns false for a duplicate.
    pub fn add(&mut self, site: impl Into<String>, fragment: Relation) -> bool {
        let list = self.fragments.entry(site.into()).or_default();
        if list.contains(&fragment) {
            return false;
        }
        list.push(fragment);
        true
    }

    pub fn fragments(&self, site: &str) -> &[Relation] {
        self.fragments.get(site).map_or(&[], Vec::as_slice)
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    /// `(site, fragment)` pairs in site order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.fragments
            .iter()
            .flat_map(|(site, list)| list.iter().map(move |f| (site.as_str(), f)))
    }

    /// Total number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the fixpoint loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A round produced nothing new.
    Converged { rounds: usize },
    /// The round bound was reached while sites were still producing.
    BoundReached { rounds: usize },
}

impl Outcome {
    pub fn rounds(&self) -> usize {
        match self {
            Outcome::Converged { rounds } | Outcome::BoundReached { rounds } => *rounds,
        }
    }
}

/// Handle on one distributed evaluation.
pub trait QueryProcessor {
    /// Deliver the plan and drive it as far as this transport allows.
    fn run(&mut self) -> ExecutionResult<()>;

    /// The settled answer, when this processor can observe one.
    fn result(&self) -> Option<&Relation>;

    /// How the last run ended, for processors that drive the loop.
    fn outcome(&self) -> Option<Outcome> {
        None
    }
}

/// Transport strategy for shipping fragments between sites.
pub trait Communicator {
    fn query_processor(&self, plan: QueryPlan) -> Box<dyn QueryProcessor + '_>;
}
