//! Wire Format Types
//!
//! JSON shapes returned by the site server. These bridge the engine's
//! internal types (Table, Tuple) and what a client reads off `/results`.

use serde::{Deserialize, Serialize};

use crate::relation::Relation;
use crate::table::Table;

/// A materialized table as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTable {
    pub name: String,
    /// Attribute display names, `table.name` when qualified.
    pub schema: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl From<&Table> for WireTable {
    fn from(table: &Table) -> Self {
        WireTable {
            name: table.name().to_owned(),
            schema: table.schema().iter().map(ToString::to_string).collect(),
            rows: table
                .iter()
                .map(|t| t.values().iter().map(|v| v.as_str().to_owned()).collect())
                .collect(),
        }
    }
}

impl WireTable {
    /// Wire form of a final result; `None` for anything but a table.
    pub fn from_relation(relation: &Relation) -> Option<Self> {
        relation.as_table().map(WireTable::from)
    }
}

/// Reply to a `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAccepted {
    pub site: String,
    /// Queries still waiting at this site after the submission.
    pub pending: usize,
    /// Fragments forwarded to other sites.
    pub forwarded: usize,
    /// Final results produced by this submission.
    pub results: usize,
    /// Queries dropped because they failed to evaluate.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub site: String,
    pub version: String,
}
