//! Portable query-language form, consumed by a downstream query compiler.
//!
//! Paths are prefixed with the caller's root alias, and every non-null
//! literal is moved into the parameter list and replaced by a positional
//! placeholder (`?1`, `?2`, ...).

use crate::{
    ast::{Node, NodeKind, Path, Spelling},
    error::{ExpressionError, Result},
    value::Value,
};

const FORM: &str = "portable";

pub struct PortablePrinter<'a> {
    /// Aliases in scope, outermost first; subqueries push their own
    aliases: Vec<String>,
    parameters: &'a mut Vec<Value>,
}

impl<'a> PortablePrinter<'a> {
    pub fn new(root_alias: &str, parameters: &'a mut Vec<Value>) -> Self {
        PortablePrinter {
            aliases: vec![root_alias.to_string()],
            parameters,
        }
    }

    pub fn print(&mut self, node: &Node) -> Result<String> {
        self.print_node(node, false)
    }

    fn alias(&self) -> &str {
        self.aliases.last().map(String::as_str).unwrap_or_default()
    }

    fn print_node(&mut self, node: &Node, has_parent: bool) -> Result<String> {
        use NodeKind::*;

        let ops = node.operands();
        let kind = node.kind();

        let text = match kind {
            Scalar(value) => return Ok(self.literal(value)),
            Parameter(name) => return Ok(format!(":{}", name)),
            ObjPath(path) => return Ok(object_path(self.alias(), path)),
            DbPath(path) | DbIdPath(path) => {
                return Ok(format!("db:{}", object_path(self.alias(), path)));
            }
            True => return Ok("true".to_string()),
            False => return Ok("false".to_string()),
            Asterisk => return Ok(self.alias().to_string()),
            CurrentDate => return Ok("current_date".to_string()),
            CurrentTime => return Ok("current_time".to_string()),
            CurrentTimestamp => return Ok("current_timestamp".to_string()),
            EnclosingObject => return self.print_enclosing(node),

            Equal | NotEqual if ops.get(1).is_some_and(is_null_literal) => {
                let keyword = if matches!(kind, Equal) { "is null" } else { "is not null" };
                format!("{} {}", self.operand(ops, 0)?, keyword)
            }

            Between | NotBetween => {
                let keyword = if matches!(kind, Between) { "between" } else { "not between" };
                format!(
                    "{} {} {} and {}",
                    self.operand(ops, 0)?,
                    keyword,
                    self.operand(ops, 1)?,
                    self.operand(ops, 2)?
                )
            }

            In | NotIn => {
                let keyword = if matches!(kind, In) { "in" } else { "not in" };
                format!("{} {} {}", self.operand(ops, 0)?, keyword, self.operand(ops, 1)?)
            }

            Like(state) | NotLike(state) | LikeIgnoreCase(state) | NotLikeIgnoreCase(state) => {
                if let Some('\'') = state.escape {
                    return Err(ExpressionError::IllegalEscape {
                        escape: '\'',
                        reason: "cannot be escaped in the portable form",
                    });
                }
                let keyword = match kind {
                    Like(_) | LikeIgnoreCase(_) => "like",
                    _ => "not like",
                };
                let subject = self.operand(ops, 0)?;
                let pattern = self.operand(ops, 1)?;
                let mut text = match kind {
                    LikeIgnoreCase(_) | NotLikeIgnoreCase(_) => {
                        format!("upper({}) {} upper({})", subject, keyword, pattern)
                    }
                    _ => format!("{} {} {}", subject, keyword, pattern),
                };
                if let Some(escape) = state.escape {
                    text.push_str(&format!(" escape '{}'", escape));
                }
                text
            }

            List => return Ok(format!("({})", self.args(ops)?)),

            Distinct => return Ok(format!("distinct {}", self.args(ops)?)),

            Any | All => {
                let keyword = if matches!(kind, Any) { "any" } else { "all" };
                return Ok(format!("{} {}", keyword, self.args(ops)?));
            }

            FunctionCall(name) => {
                let args = self.args(ops)?;
                return Ok(if args.is_empty() {
                    format!("function('{}')", name)
                } else {
                    format!("function('{}', {})", name, args)
                });
            }

            Subquery(target) => {
                let alias = format!("{}{}", self.aliases[0], self.aliases.len());
                self.aliases.push(alias.clone());
                let selected = match &target.select {
                    Some(select) => object_path(&alias, select),
                    None => alias.clone(),
                };
                let qualifier = match ops.first() {
                    Some(q) => self.print_node(q, false).map(Some),
                    None => Ok(None),
                };
                self.aliases.pop();

                let mut text = format!("(select {} from {} {}", selected, target.entity, alias);
                if let Some(qualifier) = qualifier? {
                    text.push_str(" where ");
                    text.push_str(&qualifier);
                }
                text.push(')');
                return Ok(text);
            }

            _ => match kind.portable_spelling() {
                Some(Spelling::Infix(op)) => {
                    let mut parts = Vec::with_capacity(ops.len());
                    for operand in ops {
                        parts.push(self.print_node(operand, true)?);
                    }
                    parts.join(&format!(" {} ", op))
                }
                Some(Spelling::Prefix(op)) => format!("{}{}", op, self.operand(ops, 0)?),
                Some(Spelling::Function(name)) => return Ok(format!("{}({})", name, self.args(ops)?)),
                None => {
                    return Err(ExpressionError::UnsupportedRender {
                        kind: kind.name(),
                        form: FORM,
                    });
                }
            },
        };

        Ok(if has_parent { format!("({})", text) } else { text })
    }

    /// The path of an enclosing-object reference, against the alias one
    /// level out
    fn print_enclosing(&mut self, node: &Node) -> Result<String> {
        let outer = self.aliases.len().saturating_sub(2);
        let alias = self.aliases[outer].clone();
        match node.operand(0).map(Node::kind) {
            Some(NodeKind::ObjPath(path)) => Ok(object_path(&alias, path)),
            Some(NodeKind::DbPath(path) | NodeKind::DbIdPath(path)) => {
                Ok(format!("db:{}", object_path(&alias, path)))
            }
            _ => Ok(alias),
        }
    }

    fn operand(&mut self, ops: &[Node], index: usize) -> Result<String> {
        match ops.get(index) {
            Some(op) => self.print_node(op, true),
            None => Ok(String::new()),
        }
    }

    fn args(&mut self, ops: &[Node]) -> Result<String> {
        let mut parts = Vec::with_capacity(ops.len());
        for op in ops {
            parts.push(self.print_node(op, false)?);
        }
        Ok(parts.join(", "))
    }

    /// Null stays inline; every other literal becomes a positional parameter
    fn literal(&mut self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| self.literal(v)).collect();
                format!("({})", parts.join(", "))
            }
            other => {
                self.parameters.push(other.clone());
                format!("?{}", self.parameters.len())
            }
        }
    }
}

fn is_null_literal(node: &Node) -> bool {
    matches!(node.as_scalar(), Some(Value::Null))
}

/// `alias.seg1.seg2`, aliases resolved and outer-join markers dropped
fn object_path(alias: &str, path: &Path) -> String {
    if path.is_empty() {
        return alias.to_string();
    }
    let names: Vec<&str> = path.names().collect();
    format!("{}.{}", alias, names.join("."))
}
