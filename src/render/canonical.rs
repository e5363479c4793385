//! Canonical text form: self-describing and free of external context.
//!
//! Operator nodes wrap themselves in parentheses when they have a parent;
//! function calls never do, since their own argument list already
//! delimits them.

use std::fmt::Write;

use crate::{
    ast::{Node, NodeKind, Spelling},
    value::Value,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalPrinter;

impl CanonicalPrinter {
    pub fn new() -> Self {
        CanonicalPrinter
    }

    pub fn print(&self, node: &Node) -> String {
        self.print_node(node, false)
    }

    fn print_node(&self, node: &Node, has_parent: bool) -> String {
        use NodeKind::*;

        let ops = node.operands();
        let kind = node.kind();

        match kind {
            Scalar(value) => {
                let text = literal(value);
                // `a - (-5)`, never `a - -5`
                let negative = text.starts_with('-');
                wrap(text, has_parent && negative)
            }
            Parameter(name) => format!("${}", name),
            ObjPath(path) => path.to_string(),
            DbPath(path) => format!("db:{}", path),
            DbIdPath(path) => format!("dbid:{}", path),
            True => "true".to_string(),
            False => "false".to_string(),
            Asterisk => "*".to_string(),
            EnclosingObject => format!("$.{}", self.args(ops)),

            Between | NotBetween => {
                let keyword = if matches!(kind, Between) { "between" } else { "not between" };
                let text = format!(
                    "{} {} {} and {}",
                    self.operand(ops, 0),
                    keyword,
                    self.operand(ops, 1),
                    self.operand(ops, 2)
                );
                wrap(text, has_parent)
            }

            Like(state) | NotLike(state) | LikeIgnoreCase(state) | NotLikeIgnoreCase(state) => {
                let keyword = match kind {
                    Like(_) => "like",
                    NotLike(_) => "not like",
                    LikeIgnoreCase(_) => "likeIgnoreCase",
                    _ => "not likeIgnoreCase",
                };
                let mut text = format!("{} {} {}", self.operand(ops, 0), keyword, self.operand(ops, 1));
                if let Some(escape) = state.escape {
                    let _ = write!(text, " escape '{}'", escape);
                }
                wrap(text, has_parent)
            }

            List => format!("({})", self.args(ops)),

            FunctionCall(name) => escape_call("fn", name, &self.args(ops)),
            CustomOperator(name) => escape_call("op", name, &self.args(ops)),
            CustomAggregate(name) => escape_call("agg", name, &self.args(ops)),

            CaseWhen => {
                let mut text = "case".to_string();
                for op in ops {
                    text.push(' ');
                    text.push_str(&self.print_node(op, true));
                }
                text.push_str(" end");
                text
            }
            When => format!("when {}", self.args(ops)),
            Then => format!("then {}", self.args(ops)),
            Else => format!("else {}", self.args(ops)),

            Subquery(target) => {
                let mut text = format!("subquery({}", quote(&target.entity));
                if let Some(select) = &target.select {
                    let _ = write!(text, ", {}", select);
                }
                for op in ops {
                    let _ = write!(text, ", {}", self.print_node(op, false));
                }
                text.push(')');
                text
            }

            _ => match kind.canonical_spelling() {
                Some(Spelling::Infix(op)) => {
                    let parts: Vec<String> = ops.iter().map(|o| self.print_node(o, true)).collect();
                    wrap(parts.join(&format!(" {} ", op)), has_parent)
                }
                Some(Spelling::Prefix(op)) => {
                    wrap(format!("{}{}", op, self.operand(ops, 0)), has_parent)
                }
                Some(Spelling::Function(name)) => format!("{}({})", name, self.args(ops)),
                None => kind.name().to_string(),
            },
        }
    }

    fn operand(&self, ops: &[Node], index: usize) -> String {
        ops.get(index)
            .map(|o| self.print_node(o, true))
            .unwrap_or_default()
    }

    fn args(&self, ops: &[Node]) -> String {
        ops.iter()
            .map(|o| self.print_node(o, false))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn wrap(text: String, has_parent: bool) -> String {
    if has_parent { format!("({})", text) } else { text }
}

fn escape_call(keyword: &str, name: &str, args: &str) -> String {
    if args.is_empty() {
        format!("{}({})", keyword, quote(name))
    } else {
        format!("{}({}, {})", keyword, quote(name), args)
    }
}

/// Canonical spelling of a literal value
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Byte(n) => n.to_string(),
        Value::Short(n) => n.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Long(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::Float(n) => float_literal(n.to_string()),
        Value::Double(n) => float_literal(n.to_string()),
        Value::Decimal(d) => d.to_string(),
        Value::Enum(e) => format!("enum:{}.{}", e.type_name, e.name),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            format!("x'{}'", hex)
        }
        Value::List(items) => format!(
            "({})",
            items.iter().map(literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .iter()
                .map(|k| format!("{}: {}", quote(k), literal(&map[*k])))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::ObjectId(id) => id.to_string(),
        Value::Object(object) => object.object_id().to_string(),
        Value::Entity(entity) => quote(&entity.name),
        Value::Endpoint(endpoint) => endpoint.to_string(),
        Value::Custom(custom) => quote(&format!("{:?}", custom)),
        other => match other.as_display_string() {
            Some(text) => quote(&text),
            None => quote(other.type_name()),
        },
    }
}

/// Whole floats keep a fractional part so they read back as floats
fn float_literal(text: String) -> String {
    if text.chars().all(|c| c.is_ascii_digit() || c == '-') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Double-quoted string with backslash escapes
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
