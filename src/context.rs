//! Capabilities injected by the surrounding persistence runtime.
//!
//! The engine never reads object properties or talks to a store on its own:
//! a [`Persistent`] handle supplies property access and identity, and an
//! attached [`ObjectContext`] supplies snapshots and single-row queries.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    ast::{Node, Path},
    error::StoreError,
    metadata::{Catalog, Relationship},
    value::{ObjectId, Value},
};

/// Flat map of column or attribute name to raw value
pub type Snapshot = HashMap<String, Value>;

/// A persistent object handle
pub trait Persistent: fmt::Debug + Send + Sync {
    fn object_id(&self) -> ObjectId;

    /// Reads an object property. Missing properties read as `Value::Null`;
    /// to-many relationships read as `Value::List`.
    fn read_property(&self, name: &str) -> Value;

    /// The persistence context this object is attached to, if any
    fn context(&self) -> Option<Arc<dyn ObjectContext>> {
        None
    }
}

/// Store-facing services of an attached persistence context
pub trait ObjectContext: Send + Sync {
    fn catalog(&self) -> Arc<Catalog>;

    /// Cached current snapshot of an object, if the context holds one
    fn snapshot(&self, id: &ObjectId) -> Option<Snapshot>;

    /// Executes a single-row lookup. May block on a store round-trip.
    fn select_one(&self, lookup: &ReverseLookup) -> Result<Value, StoreError>;

    /// Executes a subquery, returning its rows
    fn select(&self, request: &SubqueryRequest) -> Result<Vec<Value>, StoreError>;
}

/// Lookup of one column of a related object, expressed from the terminal
/// entity back towards the source object
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseLookup {
    /// Entity the column lives on
    pub entity: String,
    pub column: String,
    /// Relationships from `entity` back to the source object's entity
    pub reversed_path: Vec<Relationship>,
    /// Identity of the object the original path started from
    pub source_id: ObjectId,
}

impl ReverseLookup {
    /// The reversed path as a dotted store path
    pub fn reversed_db_path(&self) -> String {
        self.reversed_path
            .iter()
            .map(|r| r.db_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A subquery handed to the context for execution
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryRequest {
    pub entity: String,
    pub qualifier: Option<Node>,
    /// Column or property selected; `None` selects whole objects
    pub select: Option<Path>,
}
