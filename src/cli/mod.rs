//! CLI support for orm-expr
//!
//! Expression trees arrive as JSON (see [`convert`] for the encoding), so
//! the commands here can be embedded in other tools without a text parser.

mod convert;
mod eval;
mod render;

pub use convert::{json_to_node, json_to_value, value_to_json};
pub use eval::{EvalOptions, EvalResult, execute_eval};
pub use render::{RenderOptions, RenderResult, execute_render};

use std::{collections::HashMap, io};

use thiserror::Error;

use crate::{ExpressionError, Node, Value};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Invalid expression tree: {0}")]
    InvalidTree(String),
}

/// Parses `expression` as a JSON tree and binds `params` (a JSON object)
/// into it. Unbound parameters are left in place.
fn load_expression(expression: &str, params: Option<&str>) -> Result<Node, CliError> {
    let tree: serde_json::Value = serde_json::from_str(expression)?;
    let node = json_to_node(tree)?;

    let Some(params) = params else {
        return Ok(node);
    };

    let values: HashMap<String, Value> = match json_to_value(serde_json::from_str(params)?) {
        Value::Map(map) => map,
        other => {
            return Err(CliError::InvalidTree(format!(
                "parameters must be a JSON object, got {}",
                other.type_name()
            )));
        }
    };

    node.params_available(&values)?
        .ok_or_else(|| CliError::InvalidTree("expression folded away entirely".to_string()))
}
