use std::{cmp::Ordering, collections::HashMap};

use chrono::{Datelike, Days, Local, NaiveDate, Timelike};
use log::{debug, trace};
use rust_decimal::Decimal;

use crate::{
    ast::{DatePart, Node, NodeKind},
    context::SubqueryRequest,
    error::{ExpressionError, Result},
    registry::evaluator_for,
    resolver::{PathMode, resolve},
    value::Value,
};

/// In-memory expression evaluator.
///
/// Evaluates a tree against a subject: a map, a list, a persistent object
/// or an entity handle. Evaluation is pure except for multi-segment store
/// paths and subqueries on attached objects, which go through the object's
/// context.
///
/// Unknown (null) results follow three-valued logic: AND / OR / NOT
/// propagate null, conditions collapse it to `false`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `node` against `subject`.
    ///
    /// # Examples
    ///
    /// ```
    /// use orm_expr::{Evaluator, Node, Value};
    ///
    /// let painting = Value::map([("estimatedPrice", Value::from(12000))]);
    /// let expr = Node::between(Node::path("estimatedPrice")?, 10000, 20000)?;
    ///
    /// let result = Evaluator::new().evaluate(&expr, &painting)?;
    /// assert_eq!(result, Value::Boolean(true));
    /// # Ok::<(), orm_expr::ExpressionError>(())
    /// ```
    pub fn evaluate(&self, node: &Node, subject: &Value) -> Result<Value> {
        self.eval_node(node, subject)
    }

    fn eval_node(&self, node: &Node, subject: &Value) -> Result<Value> {
        use NodeKind::*;

        let kind = node.kind();
        let ops = node.operands();
        trace!("evaluating {} with {} operand(s)", kind.name(), ops.len());

        if ops.len() < kind.required_operands() {
            // NOT of a missing operand is false rather than unknown
            return Ok(if kind.is_condition() || matches!(kind, Not) {
                Value::Boolean(false)
            } else {
                Value::Null
            });
        }

        match kind {
            Scalar(value) => Ok(value.clone()),
            Parameter(name) => Err(ExpressionError::MissingParameter(name.clone())),
            ObjPath(path) => resolve(path, PathMode::Object, subject),
            DbPath(path) => resolve(path, PathMode::Db, subject),
            DbIdPath(path) => resolve(path, PathMode::DbId, subject),
            True => Ok(Value::Boolean(true)),
            False => Ok(Value::Boolean(false)),
            Asterisk => Ok(subject.clone()),
            CurrentDate => Ok(Value::Date(Local::now().date_naive())),
            CurrentTime => Ok(Value::Time(Local::now().time())),
            CurrentTimestamp => Ok(Value::Timestamp(Local::now().naive_local())),
            EnclosingObject => Err(ExpressionError::EnclosingObjectInSubquery),

            And => self.eval_and(ops, subject),
            Or => self.eval_or(ops, subject),
            Not => {
                let value = self.eval_node(&ops[0], subject)?;
                Ok(match value {
                    Value::Null => Value::Null,
                    v => Value::Boolean(!v.as_bool()),
                })
            }

            Equal | NotEqual | LessThan | LessOrEqual | GreaterThan | GreaterOrEqual => {
                self.eval_comparison(kind, ops, subject)
            }
            Between | NotBetween => self.eval_between(kind, ops, subject),
            In | NotIn => self.eval_in(kind, ops, subject),
            Like(_) | NotLike(_) | LikeIgnoreCase(_) | NotLikeIgnoreCase(_) => {
                self.eval_like(kind, ops, subject)
            }
            Exists => Ok(Value::Boolean(self.eval_exists(&ops[0], subject)?)),
            NotExists => Ok(Value::Boolean(!self.eval_exists(&ops[0], subject)?)),

            Any | All => Ok(Value::List(self.quantified_rows(node, subject)?)),
            Subquery(_) => Ok(Value::List(self.run_subquery(node, subject)?)),

            List => {
                let mut items = Vec::with_capacity(ops.len());
                for op in ops {
                    items.push(self.eval_node(op, subject)?);
                }
                Ok(Value::List(items))
            }

            CaseWhen => self.eval_case(ops, subject),
            When | Then | Else => self.eval_node(&ops[0], subject),

            Count | Distinct | Min | Max | Avg | Sum => self.eval_aggregate(kind, ops, subject),

            FunctionCall(name) => Err(ExpressionError::Unsupported(format!("function '{}'", name))),
            CustomOperator(name) => Err(ExpressionError::Unsupported(format!("operator '{}'", name))),
            CustomAggregate(name) => {
                Err(ExpressionError::Unsupported(format!("aggregate '{}'", name)))
            }

            _ => self.eval_broadcast(kind, ops, subject),
        }
    }

    fn eval_and(&self, ops: &[Node], subject: &Value) -> Result<Value> {
        let mut unknown = false;
        for op in ops {
            match self.eval_node(op, subject)? {
                Value::Null => unknown = true,
                v if !v.as_bool() => return Ok(Value::Boolean(false)),
                _ => {}
            }
        }
        Ok(if unknown { Value::Null } else { Value::Boolean(true) })
    }

    fn eval_or(&self, ops: &[Node], subject: &Value) -> Result<Value> {
        let mut unknown = false;
        for op in ops {
            match self.eval_node(op, subject)? {
                Value::Null => unknown = true,
                v if v.as_bool() => return Ok(Value::Boolean(true)),
                _ => {}
            }
        }
        Ok(if unknown { Value::Null } else { Value::Boolean(false) })
    }

    fn eval_comparison(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        let lhs = self.eval_node(&ops[0], subject)?;

        match ops[1].kind() {
            NodeKind::Any => {
                let rows = self.quantified_rows(&ops[1], subject)?;
                Ok(Value::Boolean(rows.iter().any(|row| compare(kind, &lhs, row))))
            }
            NodeKind::All => {
                let rows = self.quantified_rows(&ops[1], subject)?;
                Ok(Value::Boolean(rows.iter().all(|row| compare(kind, &lhs, row))))
            }
            _ => {
                let rhs = self.eval_node(&ops[1], subject)?;
                Ok(Value::Boolean(compare(kind, &lhs, &rhs)))
            }
        }
    }

    /// Either bound being incomparable makes both BETWEEN and NOT BETWEEN false
    fn eval_between(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        let value = self.eval_node(&ops[0], subject)?;
        let low = self.eval_node(&ops[1], subject)?;
        let high = self.eval_node(&ops[2], subject)?;

        let evaluator = evaluator_for(&value);
        let (Some(to_low), Some(to_high)) = (evaluator.compare(&value, &low), evaluator.compare(&value, &high))
        else {
            return Ok(Value::Boolean(false));
        };

        let inside = to_low != Ordering::Less && to_high != Ordering::Greater;
        Ok(Value::Boolean(match kind {
            NodeKind::NotBetween => !inside,
            _ => inside,
        }))
    }

    /// A null subject or a null list makes both IN and NOT IN false
    fn eval_in(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        let value = self.eval_node(&ops[0], subject)?;
        if value.is_null() {
            return Ok(Value::Boolean(false));
        }

        let items = match self.eval_node(&ops[1], subject)? {
            Value::Null => return Ok(Value::Boolean(false)),
            Value::List(items) => items,
            other => vec![other],
        };

        let evaluator = evaluator_for(&value);
        let found = items.iter().any(|item| evaluator.equals(&value, item));
        Ok(Value::Boolean(match kind {
            NodeKind::NotIn => !found,
            _ => found,
        }))
    }

    fn eval_like(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        let value = self.eval_node(&ops[0], subject)?;
        let Some(text) = value.as_display_string() else {
            return Ok(Value::Boolean(false));
        };

        let Some(state) = kind.pattern() else {
            return Ok(Value::Boolean(false));
        };
        let ignore_case = matches!(
            kind,
            NodeKind::LikeIgnoreCase(_) | NodeKind::NotLikeIgnoreCase(_)
        );

        let matched = match ops[1].as_scalar() {
            Some(Value::String(pattern)) => state
                .cache
                .get_or_compile(pattern, ignore_case, state.escape)?
                .is_match(&text),
            // Computed patterns are compiled per evaluation
            _ => match self.eval_node(&ops[1], subject)?.as_display_string() {
                Some(pattern) => crate::pattern::matches(&text, &pattern, ignore_case, state.escape)?,
                None => return Ok(Value::Boolean(false)),
            },
        };

        Ok(Value::Boolean(match kind {
            NodeKind::NotLike(_) | NodeKind::NotLikeIgnoreCase(_) => !matched,
            _ => matched,
        }))
    }

    fn eval_exists(&self, operand: &Node, subject: &Value) -> Result<bool> {
        if let NodeKind::Subquery(_) = operand.kind() {
            return Ok(!self.run_subquery(operand, subject)?.is_empty());
        }
        Ok(match self.eval_node(operand, subject)? {
            Value::Null => false,
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            _ => true,
        })
    }

    fn eval_case(&self, ops: &[Node], subject: &Value) -> Result<Value> {
        let mut branches = ops.iter();
        while let Some(op) = branches.next() {
            match op.kind() {
                NodeKind::When => {
                    let then = branches.next();
                    if self.eval_node(op, subject)?.as_bool() {
                        return match then {
                            Some(then) => self.eval_node(then, subject),
                            None => Ok(Value::Null),
                        };
                    }
                }
                NodeKind::Else => return self.eval_node(op, subject),
                _ => {}
            }
        }
        Ok(Value::Null)
    }

    /// Rows of the subquery under an ANY / ALL node
    fn quantified_rows(&self, quantifier: &Node, subject: &Value) -> Result<Vec<Value>> {
        match quantifier.operand(0) {
            Some(subquery) => self.run_subquery(subquery, subject),
            None => Ok(Vec::new()),
        }
    }

    fn run_subquery(&self, node: &Node, subject: &Value) -> Result<Vec<Value>> {
        let NodeKind::Subquery(target) = node.kind() else {
            return Err(ExpressionError::TypeError(format!(
                "expected a subquery, got {}",
                node.kind().name()
            )));
        };

        let qualifier = node.operand(0);
        if qualifier.is_some_and(references_enclosing_object) {
            return Err(ExpressionError::EnclosingObjectInSubquery);
        }

        let context = match subject {
            Value::Object(object) => object.context(),
            _ => None,
        }
        .ok_or(ExpressionError::NoContext("subquery"))?;

        let request = SubqueryRequest {
            entity: target.entity.clone(),
            qualifier: qualifier.cloned(),
            select: target.select.clone(),
        };
        debug!("running subquery over {}", request.entity);
        context.select(&request).map_err(ExpressionError::Store)
    }

    fn eval_aggregate(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        let function = kind.function_name().unwrap_or(kind.name());
        let items: Vec<Value> = match self.eval_node(&ops[0], subject)? {
            Value::List(items) => items,
            Value::Map(map) => map.into_values().collect(),
            other => {
                return Err(ExpressionError::AggregateRequiresCollection {
                    function,
                    actual: other.type_name(),
                });
            }
        };

        match kind {
            NodeKind::Count => Ok(Value::Long(items.iter().filter(|v| !v.is_null()).count() as i64)),
            NodeKind::Distinct => {
                let mut distinct: Vec<Value> = Vec::new();
                for item in items {
                    if !distinct.iter().any(|d| evaluator_for(d).equals(d, &item)) {
                        distinct.push(item);
                    }
                }
                Ok(Value::List(distinct))
            }
            NodeKind::Min => Ok(extreme(items, Ordering::Less)),
            NodeKind::Max => Ok(extreme(items, Ordering::Greater)),
            NodeKind::Sum => sum(function, &items),
            NodeKind::Avg => {
                let values: Vec<&Value> = items.iter().filter(|v| !v.is_null()).collect();
                if values.is_empty() {
                    return Ok(Value::Null);
                }
                let mut total = Decimal::ZERO;
                for value in &values {
                    total = total
                        .checked_add(to_decimal(function, value)?)
                        .ok_or_else(overflow)?;
                }
                let avg = total
                    .checked_div(Decimal::from(values.len() as u64))
                    .ok_or_else(overflow)?;
                Ok(Value::Decimal(avg.normalize()))
            }
            _ => Err(ExpressionError::Unsupported(function.to_string())),
        }
    }

    /// Arithmetic, bitwise and scalar functions. A list or map first operand
    /// is mapped element-wise (map keys kept); the remaining operands are
    /// evaluated once.
    fn eval_broadcast(&self, kind: &NodeKind, ops: &[Node], subject: &Value) -> Result<Value> {
        if ops.is_empty() {
            return Ok(Value::Null);
        }

        let first = self.eval_node(&ops[0], subject)?;
        let mut rest = Vec::with_capacity(ops.len() - 1);
        for op in &ops[1..] {
            rest.push(self.eval_node(op, subject)?);
        }

        match first {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.apply_scalar(kind, item, &rest)?);
                }
                Ok(Value::List(out))
            }
            Value::Map(map) => {
                let mut out = HashMap::with_capacity(map.len());
                for (key, item) in &map {
                    out.insert(key.clone(), self.apply_scalar(kind, item, &rest)?);
                }
                Ok(Value::Map(out))
            }
            scalar => self.apply_scalar(kind, &scalar, &rest),
        }
    }

    fn apply_scalar(&self, kind: &NodeKind, first: &Value, rest: &[Value]) -> Result<Value> {
        use NodeKind::*;

        match kind {
            Add | Subtract | Multiply | Divide => apply_arithmetic(kind, first, rest),
            Negate => negate(first),
            BitwiseNot => match first {
                Value::Null => Ok(Value::Null),
                v => Ok(Value::Long(!to_i64(kind, v)?)),
            },
            BitwiseAnd | BitwiseOr | BitwiseXor | BitwiseLeftShift | BitwiseRightShift => {
                apply_bitwise(kind, first, &rest[0])
            }
            Concat => {
                let mut out = String::new();
                for value in std::iter::once(first).chain(rest) {
                    if let Some(text) = value.as_display_string() {
                        out.push_str(&text);
                    }
                }
                Ok(Value::String(out))
            }
            Substring => fn_substring(first, &rest[0], &rest[1]),
            Trim => map_text(first, |s| s.trim().to_string()),
            Lower => map_text(first, str::to_lowercase),
            Upper => map_text(first, str::to_uppercase),
            Length => Ok(match first.as_display_string() {
                Some(s) => Value::Int(s.chars().count() as i32),
                None => Value::Null,
            }),
            Locate => fn_locate(first, &rest[0]),
            Abs => fn_abs(first),
            Sqrt => match first {
                Value::Null => Ok(Value::Null),
                v => {
                    let n = v
                        .to_f64()
                        .ok_or_else(|| type_error("sqrt", v))?;
                    Ok(Value::Double(n.sqrt()))
                }
            },
            Mod => fn_mod(first, &rest[0]),
            Extract(part) => fn_extract(*part, first),
            other => Err(ExpressionError::Unsupported(other.name().to_string())),
        }
    }
}

fn compare(kind: &NodeKind, lhs: &Value, rhs: &Value) -> bool {
    let evaluator = evaluator_for(lhs);
    match kind {
        NodeKind::Equal => evaluator.equals(lhs, rhs),
        NodeKind::NotEqual => !evaluator.equals(lhs, rhs),
        NodeKind::LessThan => evaluator.compare(lhs, rhs) == Some(Ordering::Less),
        NodeKind::LessOrEqual => matches!(
            evaluator.compare(lhs, rhs),
            Some(Ordering::Less | Ordering::Equal)
        ),
        NodeKind::GreaterThan => evaluator.compare(lhs, rhs) == Some(Ordering::Greater),
        NodeKind::GreaterOrEqual => matches!(
            evaluator.compare(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        _ => false,
    }
}

fn references_enclosing_object(node: &Node) -> bool {
    matches!(node.kind(), NodeKind::EnclosingObject)
        || node.operands().iter().any(references_enclosing_object)
}

fn type_error(operation: &str, value: &Value) -> ExpressionError {
    ExpressionError::TypeError(format!("cannot apply {} to {}", operation, value.type_name()))
}

fn overflow() -> ExpressionError {
    ExpressionError::TypeError("arithmetic overflow".to_string())
}

fn to_decimal(operation: &str, value: &Value) -> Result<Decimal> {
    value.to_decimal().ok_or_else(|| type_error(operation, value))
}

fn to_i64(kind: &NodeKind, value: &Value) -> Result<i64> {
    value.to_i64().ok_or_else(|| type_error(kind.name(), value))
}

/// Exact decimal arithmetic; any null operand makes the result null
fn apply_arithmetic(kind: &NodeKind, first: &Value, rest: &[Value]) -> Result<Value> {
    if first.is_null() || rest.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }

    let op = kind.name();
    let mut acc = to_decimal(op, first)?;
    for value in rest {
        let operand = to_decimal(op, value)?;
        acc = match kind {
            NodeKind::Add => acc.checked_add(operand),
            NodeKind::Subtract => acc.checked_sub(operand),
            NodeKind::Multiply => acc.checked_mul(operand),
            NodeKind::Divide => {
                if operand.is_zero() {
                    return Err(ExpressionError::DivisionByZero);
                }
                acc.checked_div(operand)
            }
            _ => None,
        }
        .ok_or_else(overflow)?;
    }
    Ok(Value::Decimal(acc.normalize()))
}

/// Negation keeps the operand's numeric type
fn negate(value: &Value) -> Result<Value> {
    let negated = match value {
        Value::Null => Some(Value::Null),
        Value::Byte(n) => n.checked_neg().map(Value::Byte),
        Value::Short(n) => n.checked_neg().map(Value::Short),
        Value::Int(n) => n.checked_neg().map(Value::Int),
        Value::Long(n) => n.checked_neg().map(Value::Long),
        Value::BigInt(n) => n.checked_neg().map(Value::BigInt),
        Value::Float(n) => Some(Value::Float(-*n)),
        Value::Double(n) => Some(Value::Double(-*n)),
        Value::Decimal(d) => Some(Value::Decimal(-*d)),
        other => return Err(type_error("negation", other)),
    };
    negated.ok_or_else(overflow)
}

fn apply_bitwise(kind: &NodeKind, lhs: &Value, rhs: &Value) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    let a = to_i64(kind, lhs)?;
    let b = to_i64(kind, rhs)?;

    let shift = || u32::try_from(b).ok().filter(|s| *s < 64);
    let result = match kind {
        NodeKind::BitwiseAnd => Some(a & b),
        NodeKind::BitwiseOr => Some(a | b),
        NodeKind::BitwiseXor => Some(a ^ b),
        NodeKind::BitwiseLeftShift => shift().map(|s| a << s),
        NodeKind::BitwiseRightShift => shift().map(|s| a >> s),
        _ => None,
    };
    result
        .map(Value::Long)
        .ok_or_else(|| ExpressionError::TypeError(format!("invalid shift distance {}", b)))
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Result<Value> {
    Ok(match value.as_display_string() {
        Some(s) => Value::String(f(&s)),
        None => Value::Null,
    })
}

/// 1-based `substring(text, start, length)`, clamped to the text
fn fn_substring(text: &Value, start: &Value, length: &Value) -> Result<Value> {
    let Some(text) = text.as_display_string() else {
        return Ok(Value::Null);
    };
    if start.is_null() || length.is_null() {
        return Ok(Value::Null);
    }
    let start = start.to_i64().ok_or_else(|| type_error("substring", start))?;
    let length = length.to_i64().ok_or_else(|| type_error("substring", length))?;

    let skip = usize::try_from(start.saturating_sub(1)).unwrap_or(0);
    let take = usize::try_from(length).unwrap_or(0);
    Ok(Value::String(text.chars().skip(skip).take(take).collect()))
}

/// 1-based position of `needle` in `haystack`, 0 when absent
fn fn_locate(needle: &Value, haystack: &Value) -> Result<Value> {
    let (Some(needle), Some(haystack)) = (needle.as_display_string(), haystack.as_display_string())
    else {
        return Ok(Value::Null);
    };
    let position = match haystack.find(&needle) {
        Some(byte_index) => haystack[..byte_index].chars().count() as i32 + 1,
        None => 0,
    };
    Ok(Value::Int(position))
}

fn fn_abs(value: &Value) -> Result<Value> {
    let abs = match value {
        Value::Null => Some(Value::Null),
        Value::Byte(n) => n.checked_abs().map(Value::Byte),
        Value::Short(n) => n.checked_abs().map(Value::Short),
        Value::Int(n) => n.checked_abs().map(Value::Int),
        Value::Long(n) => n.checked_abs().map(Value::Long),
        Value::BigInt(n) => n.checked_abs().map(Value::BigInt),
        Value::Float(n) => Some(Value::Float(n.abs())),
        Value::Double(n) => Some(Value::Double(n.abs())),
        Value::Decimal(d) => Some(Value::Decimal(d.abs())),
        other => return Err(type_error("abs", other)),
    };
    abs.ok_or_else(overflow)
}

fn fn_mod(lhs: &Value, rhs: &Value) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    if let (Some(a), Some(b)) = (lhs.to_i128(), rhs.to_i128()) {
        if b == 0 {
            return Err(ExpressionError::DivisionByZero);
        }
        let r = a % b;
        return Ok(i64::try_from(r).map(Value::Long).unwrap_or(Value::BigInt(r)));
    }
    let a = to_decimal("mod", lhs)?;
    let b = to_decimal("mod", rhs)?;
    if b.is_zero() {
        return Err(ExpressionError::DivisionByZero);
    }
    Ok(Value::Decimal(a.checked_rem(b).ok_or_else(overflow)?.normalize()))
}

fn fn_extract(part: DatePart, value: &Value) -> Result<Value> {
    let (date, time) = match value {
        Value::Null => return Ok(Value::Null),
        Value::Date(d) => (Some(*d), None),
        Value::Time(t) => (None, Some(*t)),
        Value::Timestamp(ts) => (Some(ts.date()), Some(ts.time())),
        other => return Err(type_error(part.name(), other)),
    };

    let n = match part {
        DatePart::Year => date.map(|d| d.year()),
        DatePart::Month => date.map(|d| d.month() as i32),
        DatePart::Week => date.map(week_of_year),
        DatePart::DayOfYear => date.map(|d| d.ordinal() as i32),
        DatePart::Day | DatePart::DayOfMonth => date.map(|d| d.day() as i32),
        DatePart::DayOfWeek => date.map(|d| d.weekday().number_from_sunday() as i32),
        DatePart::Hour => time.map(|t| t.hour() as i32),
        DatePart::Minute => time.map(|t| t.minute() as i32),
        DatePart::Second => time.map(|t| t.second() as i32),
    };
    n.map(Value::Int).ok_or_else(|| type_error(part.name(), value))
}

/// Calendar week of the year: weeks start on Sunday and week 1 is the one
/// holding January 1st, so late December can fall in week 1
fn week_of_year(date: NaiveDate) -> i32 {
    let from_sunday = date.weekday().num_days_from_sunday();
    if let Some(saturday) = date.checked_add_days(Days::new(u64::from(6 - from_sunday)))
        && saturday.year() > date.year()
    {
        return 1;
    }
    let jan1_offset = (from_sunday + 7 - date.ordinal0() % 7) % 7;
    ((date.ordinal0() + jan1_offset) / 7 + 1) as i32
}

/// Smallest (`Less`) or largest (`Greater`) non-null item
fn extreme(items: Vec<Value>, wanted: Ordering) -> Value {
    let mut best: Option<Value> = None;
    for item in items.into_iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(item),
            Some(current) => {
                if evaluator_for(&item).compare(&item, &current) == Some(wanted) {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.unwrap_or(Value::Null)
}

/// Whole-number sums stay whole; anything else sums as a decimal
fn sum(function: &str, items: &[Value]) -> Result<Value> {
    let values: Vec<&Value> = items.iter().filter(|v| !v.is_null()).collect();
    if values.is_empty() {
        return Ok(Value::Null);
    }

    if values.iter().all(|v| v.is_whole_number()) {
        let mut total: i128 = 0;
        for value in &values {
            let n = value.to_i128().ok_or_else(|| type_error(function, value))?;
            total = total.checked_add(n).ok_or_else(overflow)?;
        }
        return Ok(i64::try_from(total).map(Value::Long).unwrap_or(Value::BigInt(total)));
    }

    let mut total = Decimal::ZERO;
    for value in &values {
        total = total
            .checked_add(to_decimal(function, value)?)
            .ok_or_else(overflow)?;
    }
    Ok(Value::Decimal(total.normalize()))
}

impl Node {
    /// Evaluates this tree against `subject`
    pub fn evaluate(&self, subject: &Value) -> Result<Value> {
        Evaluator::new().evaluate(self, subject)
    }

    /// Whether `subject` satisfies this expression (null counts as no)
    pub fn matches(&self, subject: &Value) -> Result<bool> {
        Ok(self.evaluate(subject)?.as_bool())
    }

    /// First item satisfying this expression
    pub fn first<'a>(&self, items: &'a [Value]) -> Result<Option<&'a Value>> {
        for item in items {
            if self.matches(item)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Items satisfying this expression, in order
    pub fn filter_objects<I>(&self, items: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut matched = Vec::new();
        for item in items {
            if self.matches(&item)? {
                matched.push(item);
            }
        }
        Ok(matched)
    }
}

