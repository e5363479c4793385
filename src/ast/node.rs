use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::{
    ast::{NodeKind, Path, SubqueryTarget},
    error::{ExpressionError, Result},
    value::{EnumValue, ObjectId, Value},
};

/// One node of an expression tree.
///
/// A node exclusively owns its operands. Shape is fixed once construction
/// completes: builders validate arity and parent legality as operands are
/// attached, then close the node, which flattens associative kinds so that
/// `(a + b) + c` and `a + (b + c)` are the same tree.
///
/// # Examples
///
/// ```
/// use orm_expr::{Node, Value};
///
/// let expr = Node::and([
///     Node::greater_than(Node::path("estimatedPrice")?, 5000)?,
///     Node::like(Node::path("toArtist.artistName")?, "Pablo%")?,
/// ])?;
///
/// assert_eq!(
///     expr.to_string(),
///     "(estimatedPrice > 5000) and (toArtist.artistName like \"Pablo%\")"
/// );
/// # Ok::<(), orm_expr::ExpressionError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    operands: Vec<Node>,
}

/// Conversion of bare values into literal leaves
pub trait IntoNode {
    fn into_node(self) -> Node;
}

impl IntoNode for Node {
    fn into_node(self) -> Node {
        self
    }
}

impl IntoNode for Value {
    /// Lists become LIST nodes of literals; everything else a literal leaf
    fn into_node(self) -> Node {
        match self {
            Value::List(items) => Node {
                kind: NodeKind::List,
                operands: items.into_iter().map(Node::scalar).collect(),
            },
            other => Node::leaf(NodeKind::Scalar(other)),
        }
    }
}

impl IntoNode for Path {
    fn into_node(self) -> Node {
        Node::leaf(NodeKind::ObjPath(self))
    }
}

macro_rules! into_node_via_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoNode for $ty {
                fn into_node(self) -> Node {
                    Value::from(self).into_node()
                }
            }
        )*
    };
}

into_node_via_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    f32,
    f64,
    Decimal,
    char,
    String,
    &str,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    EnumValue,
    ObjectId,
    Vec<Value>,
);

impl Node {
    /// Builds a node, validating and attaching `operands` in order, then
    /// closing it.
    pub fn new<I, N>(kind: NodeKind, operands: I) -> Result<Node>
    where
        I: IntoIterator<Item = N>,
        N: IntoNode,
    {
        let mut node = Node::leaf(kind);
        for operand in operands {
            node.push_operand(operand.into_node())?;
        }
        node.close();
        Ok(node)
    }

    /// A node with no operands
    pub fn leaf(kind: NodeKind) -> Node {
        Node {
            kind,
            operands: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn operands(&self) -> &[Node] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<&Node> {
        self.operands.get(index)
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    pub fn into_operands(self) -> Vec<Node> {
        self.operands
    }

    /// The literal value of a scalar leaf
    pub fn as_scalar(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Copy of this node's kind and scalar state, without operands
    pub fn shallow_copy(&self) -> Node {
        Node::leaf(self.kind.shallow_copy())
    }

    /// Appends an operand after checking arity and parent legality.
    ///
    /// AND, OR, ADD and MULTIPLY absorb a same-kind operand's operands, so a
    /// node stays flat however it is assembled.
    pub fn push_operand(&mut self, operand: Node) -> Result<()> {
        if let Some(max) = self.kind.max_operands()
            && self.operands.len() >= max
        {
            return Err(ExpressionError::Arity {
                kind: self.kind.name(),
                max,
                actual: self.operands.len() + 1,
            });
        }
        check_operand(&self.kind, &operand)?;
        if self.absorbs(&operand) {
            self.operands.extend(operand.operands);
            return Ok(());
        }
        self.operands.push(operand);
        if self.operands.len() == 2 {
            self.invalidate_pattern();
        }
        Ok(())
    }

    /// Replaces the operand at `index`, or appends when `index` is one past
    /// the end. Replacing the pattern of a LIKE node drops its compiled
    /// pattern. A same-kind operand of a flattening node is spliced in.
    pub fn set_operand(&mut self, index: usize, operand: Node) -> Result<()> {
        if index >= self.operands.len() {
            return self.push_operand(operand);
        }
        check_operand(&self.kind, &operand)?;
        if self.absorbs(&operand) {
            self.operands.splice(index..=index, operand.operands);
            return Ok(());
        }
        self.operands[index] = operand;
        if index == 1 {
            self.invalidate_pattern();
        }
        Ok(())
    }

    fn absorbs(&self, operand: &Node) -> bool {
        self.kind.is_flattening() && operand.kind.same_kind(&self.kind)
    }

    /// Appends an operand already known to be legal here
    pub(crate) fn attach_unchecked(&mut self, operand: Node) {
        self.operands.push(operand);
    }

    fn invalidate_pattern(&mut self) {
        if let Some(state) = self.kind.pattern_mut() {
            state.cache.invalidate();
        }
    }

    /// Completes construction: associative kinds absorb same-kind operands
    pub fn close(&mut self) {
        if !self.kind.is_flattening() {
            return;
        }
        if !self.operands.iter().any(|op| op.kind.same_kind(&self.kind)) {
            return;
        }
        let operands = std::mem::take(&mut self.operands);
        for operand in operands {
            if operand.kind.same_kind(&self.kind) {
                self.operands.extend(operand.operands);
            } else {
                self.operands.push(operand);
            }
        }
    }

    // Leaves

    pub fn scalar(value: impl Into<Value>) -> Node {
        Node::leaf(NodeKind::Scalar(value.into()))
    }

    pub fn null() -> Node {
        Node::scalar(Value::Null)
    }

    /// Named parameter placeholder, bound later by `params`
    pub fn param(name: impl Into<String>) -> Node {
        Node::leaf(NodeKind::Parameter(name.into()))
    }

    /// Object path leaf from dotted text
    pub fn path(text: &str) -> Result<Node> {
        Ok(Node::leaf(NodeKind::ObjPath(Path::parse(text)?)))
    }

    /// Store path leaf (`db:`)
    pub fn db_path(text: &str) -> Result<Node> {
        Ok(Node::leaf(NodeKind::DbPath(Path::parse(text)?)))
    }

    /// Identity path leaf (`dbid:`)
    pub fn dbid_path(text: &str) -> Result<Node> {
        Ok(Node::leaf(NodeKind::DbIdPath(Path::parse(text)?)))
    }

    pub fn true_node() -> Node {
        Node::leaf(NodeKind::True)
    }

    pub fn false_node() -> Node {
        Node::leaf(NodeKind::False)
    }

    /// Reference to the object enclosing a subquery
    pub fn enclosing(path: Node) -> Result<Node> {
        Node::new(NodeKind::EnclosingObject, [path])
    }

    pub fn list<I, N>(items: I) -> Result<Node>
    where
        I: IntoIterator<Item = N>,
        N: IntoNode,
    {
        Node::new(NodeKind::List, items)
    }

    // Logical

    pub fn and<I: IntoIterator<Item = Node>>(operands: I) -> Result<Node> {
        Node::new(NodeKind::And, operands)
    }

    pub fn or<I: IntoIterator<Item = Node>>(operands: I) -> Result<Node> {
        Node::new(NodeKind::Or, operands)
    }

    pub fn not(operand: impl IntoNode) -> Result<Node> {
        Node::new(NodeKind::Not, [operand.into_node()])
    }

    // Conditions

    fn binary(kind: NodeKind, left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::new(kind, [left.into_node(), right.into_node()])
    }

    pub fn equal(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Equal, left, right)
    }

    pub fn not_equal(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::NotEqual, left, right)
    }

    pub fn less_than(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::LessThan, left, right)
    }

    pub fn less_or_equal(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::LessOrEqual, left, right)
    }

    pub fn greater_than(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::GreaterThan, left, right)
    }

    pub fn greater_or_equal(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::GreaterOrEqual, left, right)
    }

    pub fn between(subject: impl IntoNode, low: impl IntoNode, high: impl IntoNode) -> Result<Node> {
        Node::new(
            NodeKind::Between,
            [subject.into_node(), low.into_node(), high.into_node()],
        )
    }

    pub fn not_between(
        subject: impl IntoNode,
        low: impl IntoNode,
        high: impl IntoNode,
    ) -> Result<Node> {
        Node::new(
            NodeKind::NotBetween,
            [subject.into_node(), low.into_node(), high.into_node()],
        )
    }

    /// `subject in list`; a bare `Vec<Value>` becomes a LIST node
    pub fn in_list(subject: impl IntoNode, list: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::In, subject, list)
    }

    pub fn not_in(subject: impl IntoNode, list: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::NotIn, subject, list)
    }

    pub fn like(subject: impl IntoNode, pattern: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Like(Default::default()), subject, pattern)
    }

    pub fn not_like(subject: impl IntoNode, pattern: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::NotLike(Default::default()), subject, pattern)
    }

    pub fn like_ignore_case(subject: impl IntoNode, pattern: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::LikeIgnoreCase(Default::default()), subject, pattern)
    }

    pub fn not_like_ignore_case(subject: impl IntoNode, pattern: impl IntoNode) -> Result<Node> {
        Node::binary(
            NodeKind::NotLikeIgnoreCase(Default::default()),
            subject,
            pattern,
        )
    }

    /// Sets the escape character of a LIKE-family node.
    ///
    /// `?` is reserved for positional binding and always rejected.
    pub fn with_escape(mut self, escape: char) -> Result<Node> {
        if escape == '?' {
            return Err(ExpressionError::IllegalEscape {
                escape,
                reason: "reserved for positional parameters",
            });
        }
        let kind = self.kind.name();
        let state = self
            .kind
            .pattern_mut()
            .ok_or_else(|| ExpressionError::TypeError(format!("{} has no escape character", kind)))?;
        state.escape = Some(escape);
        state.cache.invalidate();
        Ok(self)
    }

    pub fn exists(operand: impl IntoNode) -> Result<Node> {
        Node::new(NodeKind::Exists, [operand.into_node()])
    }

    pub fn not_exists(operand: impl IntoNode) -> Result<Node> {
        Node::new(NodeKind::NotExists, [operand.into_node()])
    }

    // Arithmetic

    pub fn add(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Add, left, right)
    }

    pub fn subtract(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Subtract, left, right)
    }

    pub fn multiply(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Multiply, left, right)
    }

    pub fn divide(left: impl IntoNode, right: impl IntoNode) -> Result<Node> {
        Node::binary(NodeKind::Divide, left, right)
    }

    pub fn negate(operand: impl IntoNode) -> Result<Node> {
        Node::new(NodeKind::Negate, [operand.into_node()])
    }

    /// Built-in function or aggregate call, e.g. `Node::function(NodeKind::Upper, [path])`
    pub fn function<I, N>(kind: NodeKind, args: I) -> Result<Node>
    where
        I: IntoIterator<Item = N>,
        N: IntoNode,
    {
        Node::new(kind, args)
    }

    /// `count(*)`
    pub fn count_all() -> Node {
        Node {
            kind: NodeKind::Count,
            operands: vec![Node::leaf(NodeKind::Asterisk)],
        }
    }

    /// Subquery over `entity`, optionally qualified
    pub fn subquery(target: SubqueryTarget, qualifier: Option<Node>) -> Result<Node> {
        Node::new(NodeKind::Subquery(target), qualifier)
    }

    pub fn any(subquery: Node) -> Result<Node> {
        Node::new(NodeKind::Any, [subquery])
    }

    pub fn all(subquery: Node) -> Result<Node> {
        Node::new(NodeKind::All, [subquery])
    }

    /// `case when c1 then r1 ... [else d] end`
    pub fn case_when<I>(branches: I, default: Option<Node>) -> Result<Node>
    where
        I: IntoIterator<Item = (Node, Node)>,
    {
        let mut node = Node::leaf(NodeKind::CaseWhen);
        for (condition, result) in branches {
            node.push_operand(Node::new(NodeKind::When, [condition])?)?;
            node.push_operand(Node::new(NodeKind::Then, [result])?)?;
        }
        if let Some(default) = default {
            node.push_operand(Node::new(NodeKind::Else, [default])?)?;
        }
        Ok(node)
    }

    // Chaining

    /// `self and other`, flattened
    pub fn and_exp(self, other: Node) -> Result<Node> {
        self.join_exp(NodeKind::And, [other])
    }

    /// `self or other`, flattened
    pub fn or_exp(self, other: Node) -> Result<Node> {
        self.join_exp(NodeKind::Or, [other])
    }

    /// Joins `self` and `others` under a new node of `kind`, flattened
    pub fn join_exp<I: IntoIterator<Item = Node>>(self, kind: NodeKind, others: I) -> Result<Node> {
        Node::new(kind, std::iter::once(self).chain(others))
    }

    /// Negated copy: the inverse kind where one exists, the operand of a
    /// NOT, or a NOT wrapping this node.
    pub fn not_exp(&self) -> Result<Node> {
        if let Some(kind) = self.kind.inverse() {
            return Ok(Node {
                kind,
                operands: self.operands.clone(),
            });
        }
        match (&self.kind, self.operands.first()) {
            (NodeKind::Not, Some(inner)) => Ok(inner.clone()),
            _ => Node::not(self.clone()),
        }
    }
}

/// Checks that `child` may be attached under a node of kind `parent`
fn check_operand(parent: &NodeKind, child: &Node) -> Result<()> {
    use NodeKind::*;

    let parent_ok = match &child.kind {
        When | Then | Else => matches!(parent, CaseWhen),
        Any | All => parent.is_comparison(),
        Asterisk => matches!(parent, Count),
        kind if kind.is_condition() => matches!(
            parent,
            And | Or | Not | When | Then | Else | Subquery(_)
        ),
        _ => true,
    };
    if !parent_ok {
        return Err(ExpressionError::IllegalParent {
            child: child.kind.name(),
            parent: parent.name(),
        });
    }

    let child_ok = match parent {
        CaseWhen => matches!(child.kind, When | Then | Else),
        Any | All => matches!(child.kind, Subquery(_)),
        EnclosingObject => child.kind.is_path(),
        _ => true,
    };
    if !child_ok {
        return Err(ExpressionError::IllegalChild {
            child: child.kind.name(),
            parent: parent.name(),
        });
    }

    Ok(())
}
