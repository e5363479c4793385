pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod metadata;
pub mod pattern;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod transform;
pub mod value;

pub use ast::{DatePart, IntoNode, Node, NodeKind, Path, SubqueryTarget};
pub use context::{ObjectContext, Persistent, ReverseLookup, Snapshot, SubqueryRequest};
pub use error::{ExpressionError, Result, StoreError};
pub use evaluator::Evaluator;
pub use metadata::{Catalog, Endpoint, EntityDescriptor, EntityRef, Relationship};
pub use registry::{Strategy, ValueEvaluator, evaluator_for};
pub use render::{to_canonical_string, to_portable_form};
pub use transform::TraversalHandler;
pub use value::{CustomValue, EnumValue, ObjectId, Value};

#[cfg(feature = "cli")]
pub mod cli;
