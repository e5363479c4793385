//! Render an expression tree in canonical or portable form

use super::{CliError, load_expression, value_to_json};

/// Options for the render command
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// JSON-encoded expression tree
    pub expression: String,
    /// JSON object of named parameter values
    pub params: Option<String>,
    /// Render the portable form instead of the canonical one
    pub portable: bool,
    /// Root alias for portable paths
    pub root_alias: String,
}

/// Rendered text, plus the extracted literals of a portable rendering
#[derive(Debug)]
pub struct RenderResult {
    pub text: String,
    pub parameters: Vec<serde_json::Value>,
}

/// Execute a render operation
pub fn execute_render(options: &RenderOptions) -> Result<RenderResult, CliError> {
    let node = load_expression(&options.expression, options.params.as_deref())?;

    if !options.portable {
        return Ok(RenderResult {
            text: node.to_string(),
            parameters: Vec::new(),
        });
    }

    let alias = if options.root_alias.is_empty() { "a" } else { &options.root_alias };
    let mut parameters = Vec::new();
    let text = node.to_portable(&mut parameters, alias)?;

    Ok(RenderResult {
        text,
        parameters: parameters.into_iter().map(value_to_json).collect(),
    })
}
