//! Site-Local Engine
//!
//! Provides the per-site half of distributed evaluation:
//! - A registry of locally hosted relations, looked up by name
//! - Admission of query fragments and incoming partial results
//! - Evaluation of fragments once every placeholder leaf is resolved
//!
//! ## Example
//!
//! ```
//! use sitedb::engine::Engine;
//! use sitedb::relation::{Relation, VariableTable};
//! use sitedb::table::Table;
//! use sitedb::value::Schema;
//!
//! let mut table = Table::new("A", Schema::parse("a,b"));
//! table.put_values(["0", "1"]).unwrap();
//!
//! let mut engine = Engine::new("Site 1");
//! engine.put_relation("A", table);
//! engine.add_query(VariableTable::new("A").into()).unwrap();
//!
//! let processed = engine.process_pending_queries();
//! assert!(processed.failures.is_empty());
//! assert_eq!(processed.results.len(), 1);
//! assert_eq!(processed.results[0].cardinality().unwrap(), 1);
//! ```

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::execution::{ExecutionError, ExecutionResult};
use crate::protocol::xml;
use crate::relation::{Relation, VariableTable};
use crate::table::Table;

/// What one pass over the pending queue produced.
#[derive(Debug, Default)]
pub struct Processed {
    /// Evaluated queries, in queue order.
    pub results: Vec<Relation>,
    /// Errors of the queries that were dropped.
    pub failures: Vec<ExecutionError>,
}

/// One site's store and pending-query queue.
#[derive(Debug, Clone)]
pub struct Engine {
    site: String,
    relations: HashMap<String, Relation>,
    pending: Vec<Relation>,
    tuples_received: usize,
}

impl Engine {
    pub fn new(site: impl Into<String>) -> Self {
        Engine {
            site: site.into(),
            relations: HashMap::new(),
            pending: Vec::new(),
            tuples_received: 0,
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Host `relation` locally under `name`. Replaces any previous entry.
    pub fn put_relation(&mut self, name: impl Into<String>, relation: impl Into<Relation>) {
        let name = name.into();
        debug!(site = %self.site, relation = %name, "relation_registered");
        self.relations.insert(name, relation.into());
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Admit a fragment or an incoming partial result.
    ///
    /// - A placeholder addressed to another site is a plan to run here: its
    ///   leaves are linked to local relations and it joins the pending queue.
    /// - A placeholder addressed to this site is data for a plan already
    ///   pending: it is linked under every matching leaf of the queue.
    /// - Anything else is linked to local relations and queued.
    ///
    /// A linking failure rejects this fragment only; the engine is unchanged
    /// apart from the received-tuple counter.
    pub fn add_query(&mut self, mut query: Relation) -> ExecutionResult<()> {
        self.tuples_received += query.tuple_count();

        if let Relation::Variable(vt) = &query {
            if vt.site() == self.site {
                return self.deliver(vt.clone());
            }
        }

        let linked = query.link_tables(&self.relations)?;
        info!(
            site = %self.site,
            linked,
            fragment = query.as_variable().map(VariableTable::name).unwrap_or(""),
            ready = query.is_ready(),
            "fragment_admitted"
        );
        self.pending.push(query);
        Ok(())
    }

    pub fn add_queries(&mut self, queries: impl IntoIterator<Item = Relation>) -> ExecutionResult<()> {
        for q in queries {
            self.add_query(q)?;
        }
        Ok(())
    }

    fn deliver(&mut self, data: VariableTable) -> ExecutionResult<()> {
        let name = data.name().to_owned();
        let incoming = HashMap::from([(name.clone(), Relation::Variable(data))]);
        let mut linked = 0;
        for q in &mut self.pending {
            linked += q.link_tables(&incoming)?;
        }
        if linked == 0 {
            warn!(site = %self.site, fragment = %name, "fragment_unmatched");
        } else {
            info!(site = %self.site, fragment = %name, linked, "fragment_delivered");
        }
        Ok(())
    }

    /// Evaluate every pending query whose tree is ready.
    ///
    /// Each result is a fresh table; a query that was itself a placeholder
    /// comes back wrapped in a placeholder with the same name and site so the
    /// caller can route it. Queries that are not ready stay queued. A query
    /// whose evaluation fails is dropped and its error reported alongside the
    /// results of the others.
    pub fn process_pending_queries(&mut self) -> Processed {
        let mut processed = Processed::default();
        let mut i = 0;
        while i < self.pending.len() {
            if !self.pending[i].is_ready() {
                i += 1;
                continue;
            }
            let query = self.pending.remove(i);
            let table = match query.materialize() {
                Ok(table) => table,
                Err(e) => {
                    warn!(site = %self.site, error = %e, "query_failed");
                    processed.failures.push(e);
                    continue;
                }
            };
            let result = match &query {
                Relation::Variable(vt) => {
                    info!(site = %self.site, fragment = %vt.name(), to = %vt.site(), tuples = table.len(), "fragment_ready");
                    VariableTable::wrapping(vt.name(), vt.site(), table).into()
                }
                _ => {
                    info!(site = %self.site, tuples = table.len(), "result_ready");
                    table.into()
                }
            };
            processed.results.push(result);
        }
        processed
    }

    pub fn pending_queries(&self) -> &[Relation] {
        &self.pending
    }

    /// Link against local relations and evaluate immediately.
    pub fn evaluate(&mut self, mut query: Relation) -> ExecutionResult<Table> {
        self.tuples_received += query.tuple_count();
        query.link_tables(&self.relations)?;
        query.materialize()
    }

    /// Parse an XML query and evaluate it.
    pub fn evaluate_xml(&mut self, text: &str) -> ExecutionResult<Table> {
        let query = xml::parse(text)?;
        self.evaluate(query)
    }

    /// Sum of the cardinalities of the locally hosted relations.
    pub fn storage_size(&self) -> ExecutionResult<usize> {
        self.relations.values().map(Relation::cardinality).sum()
    }

    /// Stored tuples received through admitted queries so far.
    pub fn tuples_received(&self) -> usize {
        self.tuples_received
    }
}
