//! Error types shared by construction, evaluation, rendering and rewriting.

use thiserror::Error;

/// Error reported by an injected store collaborator (snapshot lookups,
/// reverse path lookups, subquery execution). Passed through unchanged.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building, evaluating, rendering or rewriting
/// an expression tree.
#[derive(Debug, Error)]
pub enum ExpressionError {
    // Construction
    /// A node was given more operands than its kind accepts
    #[error("{kind} accepts at most {max} operand(s), got {actual}")]
    Arity {
        kind: &'static str,
        max: usize,
        actual: usize,
    },

    /// A node was attached under a parent kind that does not admit it
    #[error("{child} cannot be an operand of {parent}")]
    IllegalParent {
        child: &'static str,
        parent: &'static str,
    },

    /// A node kind only admits operands of particular kinds
    #[error("{parent} does not admit {child} as an operand")]
    IllegalChild {
        child: &'static str,
        parent: &'static str,
    },

    /// A path alias is bound to two different segments, or a segment to two aliases
    #[error("alias '{alias}' conflicts: already bound to '{existing}', cannot bind to '{segment}'")]
    AliasConflict {
        alias: String,
        existing: String,
        segment: String,
    },

    /// Malformed path text, or a path that does not resolve against metadata
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Escape character that cannot be used in the requested context
    #[error("illegal escape character '{escape}': {reason}")]
    IllegalEscape { escape: char, reason: &'static str },

    // Evaluation
    /// The node kind has no in-memory evaluation semantics
    #[error("in-memory evaluation is not supported for {0}")]
    Unsupported(String),

    /// An aggregate function was applied to something other than a collection
    #[error("{function}() requires a collection, got {actual}")]
    AggregateRequiresCollection {
        function: &'static str,
        actual: &'static str,
    },

    /// A subquery refers to its enclosing object, which in-memory evaluation cannot bind
    #[error("subquery references its enclosing object; in-memory evaluation is not a query engine")]
    EnclosingObjectInSubquery,

    /// Evaluation needs an attached persistence context and none is available
    #[error("{0} requires a subject attached to a persistence context")]
    NoContext(&'static str),

    /// Operand of an unexpected type
    #[error("type error: {0}")]
    TypeError(String),

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    // Rendering
    /// The node kind has no spelling in the requested textual form
    #[error("{kind} cannot be rendered in {form} form")]
    UnsupportedRender {
        kind: &'static str,
        form: &'static str,
    },

    // Parameter binding
    /// A named parameter had no value and pruning was not requested
    #[error("missing required parameter: ${0}")]
    MissingParameter(String),

    /// Positional binding ran out of values
    #[error("too few parameters to bind expression: {0}")]
    TooFewParameters(usize),

    /// Positional binding was given more values than the expression uses
    #[error("too many parameters to bind expression: expected {expected}, actual {actual}")]
    TooManyParameters { expected: usize, actual: usize },

    /// A LIKE pattern failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Failure reported by the store collaborator
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;
