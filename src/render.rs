//! Textual forms of an expression tree.
//!
//! - [canonical] - self-describing syntax, the `Display` form of [`Node`]
//! - [portable] - query-language text plus an ordered parameter list, for a
//!   downstream query compiler

pub mod canonical;
pub mod portable;

use std::fmt;

pub use canonical::CanonicalPrinter;
pub use portable::PortablePrinter;

use crate::{ast::Node, error::Result, value::Value};

/// Canonical form of `node`
pub fn to_canonical_string(node: &Node) -> String {
    CanonicalPrinter::new().print(node)
}

/// Portable form of `node`, appending extracted literals to `parameters`.
///
/// Placeholders are numbered from the current length of `parameters`, so a
/// caller can render several trees into one parameter list.
///
/// # Examples
///
/// ```
/// use orm_expr::{Node, render::to_portable_form};
///
/// let expr = Node::like_ignore_case(Node::path("toArtist.artistName")?, "pic%")?;
/// let mut parameters = Vec::new();
///
/// let text = to_portable_form(&expr, &mut parameters, "p")?;
/// assert_eq!(text, "upper(p.toArtist.artistName) like upper(?1)");
/// assert_eq!(parameters.len(), 1);
/// # Ok::<(), orm_expr::ExpressionError>(())
/// ```
pub fn to_portable_form(node: &Node, parameters: &mut Vec<Value>, root_alias: &str) -> Result<String> {
    PortablePrinter::new(root_alias, parameters).print(node)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_canonical_string(self))
    }
}

impl Node {
    /// Portable form of this tree; see [`to_portable_form`]
    pub fn to_portable(&self, parameters: &mut Vec<Value>, root_alias: &str) -> Result<String> {
        to_portable_form(self, parameters, root_alias)
    }
}
