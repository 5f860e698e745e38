//! In-process communicator: every site's engine lives in one registry.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Communicator, Outcome, QueryPlan, QueryProcessor};
use crate::config::Config;
use crate::engine::Engine;
use crate::execution::{ExecutionError, ExecutionResult};
use crate::relation::Relation;

/// Simulated network of sites driven round by round.
///
/// The registry lock is held for the whole of a query's run, so at most one
/// query drives the fixpoint loop at a time.
#[derive(Debug)]
pub struct CentralizedCommunicator {
    sites: Mutex<BTreeMap<String, Engine>>,
    max_rounds: usize,
}

impl CentralizedCommunicator {
    pub const DEFAULT_MAX_ROUNDS: usize = 100;

    pub fn new(max_rounds: usize) -> Self {
        CentralizedCommunicator {
            sites: Mutex::new(BTreeMap::new()),
            max_rounds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        CentralizedCommunicator::new(config.engine.max_rounds)
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Register an engine under its site name, replacing any previous one.
    pub fn add_site(&self, engine: Engine) {
        debug!(site = %engine.site(), "site_registered");
        self.sites.lock().insert(engine.site().to_owned(), engine);
    }

    pub fn site_names(&self) -> Vec<String> {
        self.sites.lock().keys().cloned().collect()
    }

    /// Snapshot of a registered engine.
    pub fn site(&self, name: &str) -> Option<Engine> {
        self.sites.lock().get(name).cloned()
    }

    /// Run `f` against a registered engine.
    pub fn with_site<R>(&self, name: &str, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
        self.sites.lock().get_mut(name).map(f)
    }

    /// One round over every site. Final results are appended to `finals` and
    /// the errors of queries that failed to evaluate to `failures`.
    ///
    /// Returns how many results the sites produced.
    pub fn round(&self, finals: &mut Vec<Relation>, failures: &mut Vec<ExecutionError>) -> usize {
        run_round(&mut self.sites.lock(), finals, failures)
    }

    pub fn query_processor(&self, plan: QueryPlan) -> CentralizedQueryProcessor<'_> {
        CentralizedQueryProcessor {
            communicator: self,
            plan,
            results: Vec::new(),
            failures: Vec::new(),
            outcome: None,
        }
    }
}

impl Default for CentralizedCommunicator {
    fn default() -> Self {
        CentralizedCommunicator::new(CentralizedCommunicator::DEFAULT_MAX_ROUNDS)
    }
}

impl Communicator for CentralizedCommunicator {
    fn query_processor(&self, plan: QueryPlan) -> Box<dyn QueryProcessor + '_> {
        Box::new(CentralizedCommunicator::query_processor(self, plan))
    }
}

/// Hand `fragment` to `site`'s engine.
///
/// An unknown site or a rejected admission drops the fragment; the loop
/// carries on and the plan simply never completes through it.
fn deliver(sites: &mut BTreeMap<String, Engine>, site: &str, fragment: Relation) {
    let result = match sites.get_mut(site) {
        Some(engine) => engine.add_query(fragment),
        None => Err(ExecutionError::UnknownSite(site.to_owned())),
    };
    if let Err(e) = result {
        warn!(site = %site, error = %e, "fragment_undeliverable");
    }
}

fn run_round(
    sites: &mut BTreeMap<String, Engine>,
    finals: &mut Vec<Relation>,
    failures: &mut Vec<ExecutionError>,
) -> usize {
    let mut produced = Vec::new();
    for engine in sites.values_mut() {
        let processed = engine.process_pending_queries();
        produced.extend(processed.results);
        failures.extend(processed.failures);
    }
    let count = produced.len();
    for result in produced {
        match &result {
            Relation::Variable(vt) => {
                let destination = vt.site().to_owned();
                deliver(sites, &destination, result);
            }
            _ => finals.push(result),
        }
    }
    count
}

/// Drives one plan over a [`CentralizedCommunicator`].
pub struct CentralizedQueryProcessor<'c> {
    communicator: &'c CentralizedCommunicator,
    plan: QueryPlan,
    results: Vec<Relation>,
    failures: Vec<ExecutionError>,
    outcome: Option<Outcome>,
}

impl CentralizedQueryProcessor<'_> {
    /// Every final result of the last run, in production order.
    pub fn results(&self) -> &[Relation] {
        &self.results
    }

    /// Errors of the fragments that failed to evaluate during the last run.
    ///
    /// A failed fragment is dropped; the rest of the plan keeps running.
    pub fn failures(&self) -> &[ExecutionError] {
        &self.failures
    }
}

impl QueryProcessor for CentralizedQueryProcessor<'_> {
    fn run(&mut self) -> ExecutionResult<()> {
        let mut sites = self.communicator.sites.lock();
        let max_rounds = self.communicator.max_rounds;
        self.results.clear();
        self.failures.clear();
        self.outcome = None;

        for (site, fragment) in self.plan.iter() {
            deliver(&mut sites, site, fragment.clone());
        }

        let mut rounds = 0;
        let outcome = loop {
            if rounds >= max_rounds {
                break Outcome::BoundReached { rounds };
            }
            let produced = run_round(&mut sites, &mut self.results, &mut self.failures);
            rounds += 1;
            debug!(round = rounds, produced, "round_complete");
            if produced == 0 {
                break Outcome::Converged { rounds };
            }
        };
        self.outcome = Some(outcome);

        match outcome {
            Outcome::Converged { rounds } => {
                info!(rounds, results = self.results.len(), failures = self.failures.len(), "fixpoint_reached");
            }
            Outcome::BoundReached { rounds } => {
                warn!(rounds, results = self.results.len(), failures = self.failures.len(), "round_bound_reached");
            }
        }

        if self.results.is_empty() {
            return Err(match outcome {
                Outcome::Converged { rounds } => ExecutionError::NoResult { rounds },
                Outcome::BoundReached { rounds } => ExecutionError::NonConvergence { rounds },
            });
        }
        Ok(())
    }

    fn result(&self) -> Option<&Relation> {
        self.results.first()
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::relation::VariableTable;
    use crate::table::Table;
    use crate::value::{Attribute, Schema, Value};

    fn site(name: &str, table: &str) -> Engine {
        let mut t = Table::new(table, Schema::parse("a"));
        t.put_values(["1"]).unwrap();
        t.put_values(["2"]).unwrap();
        let mut e = Engine::new(name);
        e.put_relation(table, t);
        e
    }

    #[test]
    fn test_local_query_converges() {
        let comm = CentralizedCommunicator::default();
        comm.add_site(site("S1", "A"));
        let mut plan = QueryPlan::new();
        plan.add("S1", Relation::projection(Schema::parse("A.a"), VariableTable::new("A")));
        let mut qp = comm.query_processor(plan);
        qp.run().unwrap();
        assert_eq!(qp.outcome(), Some(Outcome::Converged { rounds: 2 }));
        assert_eq!(qp.results().len(), 1);
    }

    #[test]
    fn test_unknown_site_is_dropped() {
        let comm = CentralizedCommunicator::default();
        comm.add_site(site("S1", "A"));
        let mut plan = QueryPlan::new();
        plan.add("S1", VariableTable::wrapping("x", "Nowhere", VariableTable::new("A")).into());
        let mut qp = comm.query_processor(plan);
        let err = qp.run().unwrap_err();
        assert_eq!(err, ExecutionError::NoResult { rounds: 2 });
    }

    #[test]
    fn test_failed_fragment_does_not_stop_other_fragments() {
        let comm = CentralizedCommunicator::default();
        comm.add_site(site("S1", "A"));
        comm.add_site(site("S2", "B"));
        let mut plan = QueryPlan::new();
        let broken = Condition::equals(Attribute::parse("A.zz"), Value::from("1"));
        plan.add("S1", Relation::selection(broken, VariableTable::new("A")));
        plan.add("S2", Relation::projection(Schema::parse("B.a"), VariableTable::new("B")));
        let mut qp = comm.query_processor(plan);
        qp.run().unwrap();
        assert_eq!(qp.outcome(), Some(Outcome::Converged { rounds: 2 }));
        assert_eq!(qp.results().len(), 1);
        assert_eq!(qp.result().unwrap().cardinality().unwrap(), 2);
        assert_eq!(qp.failures(), [ExecutionError::UnknownAttribute("A.zz".to_owned())]);
        assert!(comm.site("S2").unwrap().pending_queries().is_empty());
    }

    #[test]
    fn test_round_on_idle_network_produces_nothing() {
        let comm = CentralizedCommunicator::new(5);
        comm.add_site(site("S1", "A"));
        let (mut finals, mut failures) = (Vec::new(), Vec::new());
        assert_eq!(comm.round(&mut finals, &mut failures), 0);
        assert!(finals.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_with_site_mutates_registry() {
        let comm = CentralizedCommunicator::new(5);
        comm.add_site(Engine::new("S1"));
        comm.with_site("S1", |e| e.put_relation("A", Table::new("A", Schema::parse("a"))));
        assert!(comm.site("S1").unwrap().relation("A").is_some());
        assert!(comm.with_site("S9", |_| ()).is_none());
        assert_eq!(comm.site_names(), ["S1"]);
    }
}
