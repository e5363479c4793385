//! Map-and-prune tree rewriting, parameter binding and traversal.
//!
//! Rewrites never touch the source tree: every node is rebuilt from a
//! shallow copy with its rewritten operands attached, then handed to the
//! caller's function. `None` from that function prunes the node. A pruned
//! operand is dropped from AND / OR / LIST parents; any other parent is
//! pruned along with it.

use std::collections::HashMap;

use log::debug;

use crate::{
    ast::{IntoNode, Node, NodeKind},
    error::{ExpressionError, Result},
    value::Value,
};

/// Callbacks for a depth-first walk of a tree
pub trait TraversalHandler {
    /// Called before any operand of `node` is visited
    fn start_node(&mut self, _node: &Node, _parent: Option<&Node>) {}

    /// Called after the operand at `index` of `node` has been fully visited
    fn finished_child(&mut self, _node: &Node, _index: usize, _has_more_children: bool) {}

    /// Called after every operand of `node` has been visited
    fn end_node(&mut self, _node: &Node, _parent: Option<&Node>) {}
}

impl Node {
    /// Rebuilds the tree bottom-up, replacing each node with
    /// `f(copy_with_rewritten_operands)`.
    ///
    /// After `f` runs, a one-operand AND / OR collapses to its operand, a
    /// zero-operand AND / OR is pruned, and IN / NOT IN over an empty list
    /// fold to FALSE / TRUE. Returns `None` when the root itself is pruned.
    pub fn transform<F>(&self, mut f: F) -> Result<Option<Node>>
    where
        F: FnMut(Node) -> Result<Option<Node>>,
    {
        transform_node(self, &mut f)
    }

    /// Independent copy of the whole tree, with fresh pattern caches
    pub fn deep_copy(&self) -> Node {
        let mut copy = self.shallow_copy();
        for operand in self.operands() {
            copy.attach_unchecked(operand.deep_copy());
        }
        copy
    }

    /// Replaces named parameters with values from `parameters`.
    ///
    /// A missing name prunes the condition that uses it when `prune_missing`
    /// is set, and is an error otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use orm_expr::{Node, Value};
    ///
    /// let template = Node::and([
    ///     Node::equal(Node::path("artistName")?, Node::param("name"))?,
    ///     Node::greater_than(Node::path("estimatedPrice")?, Node::param("price"))?,
    /// ])?;
    ///
    /// let mut values = HashMap::new();
    /// values.insert("name".to_string(), Value::from("Picasso"));
    ///
    /// let bound = template.params(&values, true)?.unwrap();
    /// assert_eq!(bound.to_string(), "artistName = \"Picasso\"");
    /// # Ok::<(), orm_expr::ExpressionError>(())
    /// ```
    pub fn params(&self, parameters: &HashMap<String, Value>, prune_missing: bool) -> Result<Option<Node>> {
        self.transform(|node| match node.kind() {
            NodeKind::Parameter(name) => match parameters.get(name) {
                Some(value) => Ok(Some(value.clone().into_node())),
                None if prune_missing => Ok(None),
                None => Err(ExpressionError::MissingParameter(name.clone())),
            },
            _ => Ok(Some(node)),
        })
    }

    /// Binds the names present in `parameters` and leaves every other
    /// parameter in place for a later binding.
    pub fn params_available(&self, parameters: &HashMap<String, Value>) -> Result<Option<Node>> {
        self.transform(|node| match node.kind() {
            NodeKind::Parameter(name) => Ok(Some(match parameters.get(name) {
                Some(value) => value.clone().into_node(),
                None => node,
            })),
            _ => Ok(Some(node)),
        })
    }

    /// Binds parameters positionally, in depth-first left-to-right order.
    ///
    /// A name that occurs more than once takes the value bound to its first
    /// occurrence. Supplying fewer or more values than distinct names is an
    /// error.
    pub fn params_array(&self, values: &[Value]) -> Result<Option<Node>> {
        let mut bound: HashMap<String, Value> = HashMap::new();
        let mut next = 0;

        let result = self.transform(|node| match node.kind() {
            NodeKind::Parameter(name) => {
                if let Some(value) = bound.get(name) {
                    return Ok(Some(value.clone().into_node()));
                }
                let value = values
                    .get(next)
                    .cloned()
                    .ok_or(ExpressionError::TooFewParameters(values.len()))?;
                next += 1;
                bound.insert(name.clone(), value.clone());
                Ok(Some(value.into_node()))
            }
            _ => Ok(Some(node)),
        })?;

        if next < values.len() {
            return Err(ExpressionError::TooManyParameters {
                expected: next,
                actual: values.len(),
            });
        }
        Ok(result)
    }

    /// Depth-first walk invoking `handler` callbacks
    pub fn traverse<H: TraversalHandler>(&self, handler: &mut H) {
        traverse_node(self, None, handler);
    }
}

fn transform_node<F>(node: &Node, f: &mut F) -> Result<Option<Node>>
where
    F: FnMut(Node) -> Result<Option<Node>>,
{
    let mut copy = node.shallow_copy();

    for operand in node.operands() {
        match transform_node(operand, f)? {
            Some(rewritten) => copy.push_operand(rewritten)?,
            None if drops_pruned_operand(node.kind()) => {}
            None => {
                debug!("pruning {} with a pruned operand", node.kind().name());
                return Ok(None);
            }
        }
    }
    copy.close();

    match f(copy)? {
        Some(rewritten) => Ok(fold(rewritten)),
        None => Ok(None),
    }
}

fn drops_pruned_operand(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::And | NodeKind::Or | NodeKind::List)
}

/// Self-pruning of degenerate logical nodes and constant folding of IN
/// over an empty list
fn fold(node: Node) -> Option<Node> {
    match node.kind() {
        NodeKind::And | NodeKind::Or => match node.operand_count() {
            0 => {
                debug!("pruning empty {}", node.kind().name());
                None
            }
            1 => node.into_operands().pop(),
            _ => Some(node),
        },
        NodeKind::In | NodeKind::NotIn if node.operand(1).is_some_and(is_empty_list) => {
            debug!("folding {} over an empty list", node.kind().name());
            Some(match node.kind() {
                NodeKind::In => Node::false_node(),
                _ => Node::true_node(),
            })
        }
        _ => Some(node),
    }
}

fn is_empty_list(node: &Node) -> bool {
    match node.kind() {
        NodeKind::List => node.operand_count() == 0,
        NodeKind::Scalar(Value::List(items)) => items.is_empty(),
        _ => false,
    }
}

fn traverse_node<H: TraversalHandler>(node: &Node, parent: Option<&Node>, handler: &mut H) {
    handler.start_node(node, parent);

    let count = node.operand_count();
    for (index, operand) in node.operands().iter().enumerate() {
        traverse_node(operand, Some(node), handler);
        handler.finished_child(node, index, index + 1 < count);
    }

    handler.end_node(node, parent);
}
