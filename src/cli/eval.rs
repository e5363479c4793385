//! Evaluate an expression tree against JSON input

use super::{CliError, json_to_value, load_expression, value_to_json};
use crate::Evaluator;

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// JSON-encoded expression tree
    pub expression: String,
    /// JSON input string
    pub input: Option<String>,
    /// JSON object of named parameter values
    pub params: Option<String>,
    /// Evaluate against each element of an input array, keeping the matches
    pub filter: bool,
    /// Only decode the tree, don't evaluate
    pub validate_only: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub enum EvalResult {
    /// Tree decoded; carries its canonical form
    Valid(String),
    /// Evaluated successfully with JSON output
    Success(serde_json::Value),
}

/// Execute an eval operation
pub fn execute_eval(options: &EvalOptions) -> Result<EvalResult, CliError> {
    let node = load_expression(&options.expression, options.params.as_deref())?;

    if options.validate_only {
        return Ok(EvalResult::Valid(node.to_string()));
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let subject = json_to_value(serde_json::from_str(json_str)?);

    if options.filter {
        let items = match subject {
            crate::Value::List(items) => items,
            other => vec![other],
        };
        let matched = node.filter_objects(items)?;
        return Ok(EvalResult::Success(value_to_json(crate::Value::List(matched))));
    }

    let result = Evaluator::new().evaluate(&node, &subject)?;
    Ok(EvalResult::Success(value_to_json(result)))
}
