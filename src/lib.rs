//! # sitedb
//!
//! A small distributed relational-algebra engine. Queries are trees of
//! algebra operators over named tables; a query plan splits a tree into
//! fragments that run at the sites hosting the data, and partial results
//! travel between sites as placeholder tables until every leaf is
//! resolved.
//!
//! ## Pipeline
//!
//! ```text
//! QueryPlan (fragments per site)
//!     ↓
//! Communicator            → delivers fragments to sites
//!     ↓
//! Engine (per site)       → links leaves to local tables, evaluates ready fragments
//!     ↓
//! VariableTable results   → routed to the site they name
//!     ↓
//! ... rounds until nothing moves (bounded)
//!     ↓
//! Final Table
//! ```
//!
//! ## Modules
//!
//! - [`value`]: values, attributes, schemas, tuples
//! - [`table`]: sorted duplicate-free tuple storage
//! - [`condition`]: boolean conditions over tuples
//! - [`relation`]: the operator tree and placeholder tables
//! - [`execution`]: streaming evaluation and execution errors
//! - [`engine`]: one site's store and pending queue
//! - [`distributed`]: query plans, communicators, the fixpoint loop
//! - [`protocol`]: XML interchange and the per-site HTTP server
//! - [`storage`]: CSV loading and saving
//! - [`graphviz`]: `dot` rendering of operator trees
//!
//! ## Usage
//!
//! ```
//! use sitedb::condition::Condition;
//! use sitedb::relation::Relation;
//! use sitedb::storage::parse_table;
//! use sitedb::value::{Attribute, Value};
//!
//! let a = parse_table("A", "a,b\n0,1\n1,2\n0,3").unwrap();
//! let query = Relation::selection(
//!     Condition::equals(Attribute::parse("A.a"), Value::from("0")),
//!     a,
//! );
//! assert_eq!(query.cardinality().unwrap(), 2);
//! ```

pub mod condition;
pub mod config;
pub mod distributed;
pub mod engine;
pub mod execution;
pub mod graphviz;
pub mod logging;
pub mod protocol;
pub mod relation;
pub mod storage;
pub mod table;
pub mod value;

pub use config::Config;
pub use engine::Engine;
pub use execution::{ExecutionError, ExecutionResult};
pub use relation::{Relation, VariableTable};
pub use table::Table;
