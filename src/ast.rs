//! # Expression Tree
//!
//! The node model shared by evaluation, rendering and rewriting.
//!
//! ## Architecture Overview
//!
//! - **[node]** - [`Node`]: a kind plus owned operands, with validating builders
//! - **[kinds]** - [`NodeKind`]: the closed set of node kinds and their scalar state
//! - **[path]** - [`Path`]: dotted, alias-annotated property paths
//! - **[operators]** - operator and function spellings per textual form
//!
//! ## Node Families
//!
//! | Family      | Kinds                                                           |
//! |-------------|-----------------------------------------------------------------|
//! | Leaves      | scalar, parameter, object / store / identity path, true, false  |
//! | Logical     | and, or, not (three-valued)                                     |
//! | Conditions  | comparisons, between, in, like, exists, with any / all          |
//! | Arithmetic  | add, subtract, multiply, divide, negate; bitwise operators      |
//! | Functions   | string, math and date functions; aggregates                     |
//! | Escapes     | `fn(...)`, `op(...)`, `agg(...)`                                |
//! | Other       | case / when / then / else, subquery, enclosing object           |
//!
//! ## Construction Rules
//!
//! Builders check arity and parent legality as operands are attached:
//!
//! - a condition may only sit at the top of a tree or under AND / OR / NOT,
//!   a CASE branch, or a subquery
//! - WHEN / THEN / ELSE only under CASE, ANY / ALL only on the right of a
//!   comparison, `*` only inside `count`
//!
//! AND, OR, ADD and MULTIPLY absorb same-kind operands when closed, so
//! nested and flat spellings produce the same tree.
//!
//! ## Examples
//!
//! ```text
//! artistName = "Picasso"
//! (estimatedPrice between 1000 and 5000) and (toArtist.artistName like "P%")
//! db:ARTIST_ID in (1, 2, 3)
//! count(paintings) > 2
//! ```
pub mod kinds;
pub mod node;
pub mod operators;
pub mod path;

pub use kinds::{DatePart, NodeKind, PatternState, SubqueryTarget};
pub use node::{IntoNode, Node};
pub use operators::Spelling;
pub use path::{Path, Segment};
