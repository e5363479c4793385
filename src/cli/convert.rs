//! JSON <-> Value conversion and the JSON encoding of expression trees
//!
//! Tree encoding:
//!
//! ```text
//! 42, "text", true, null       literal
//! [1, 2, 3]                    literal list
//! {"path": "toArtist.name"}    object path
//! {"db": "ARTIST_ID"}          store path
//! {"dbid": "ARTIST_ID"}        identity path
//! {"param": "name"}            named parameter
//! {"list": [...]}              list of sub-trees
//! {"date": "2024-01-31"}       date literal (also "time", "timestamp")
//! {"op": "=", "args": [...]}   operator or function by keyword
//! ```
//!
//! `op` objects take optional extra keys: `escape` for LIKE kinds, `name` for
//! the `fn` / `op` / `agg` escapes, and `entity` / `select` for `subquery`.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::Map;

use super::CliError;
use crate::{Node, NodeKind, SubqueryTarget, Value, ast::Path};

/// Convert serde_json::Value to Value. Integers become longs and other
/// numbers exact decimals.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => number_to_value(&n),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Map(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

fn number_to_value(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Long(i);
    }
    match Decimal::from_str(&n.to_string()) {
        Ok(d) => Value::Decimal(d),
        Err(_) => n.as_f64().map(Value::Double).unwrap_or(Value::Null),
    }
}

/// Convert Value to serde_json::Value. Values with no JSON counterpart
/// become their display text.
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Byte(n) => n.into(),
        Value::Short(n) => n.into(),
        Value::Int(n) => n.into(),
        Value::Long(n) => n.into(),
        Value::BigInt(n) => match i64::try_from(n) {
            Ok(n) => n.into(),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        Value::Float(f) => float_to_json(f as f64),
        Value::Double(f) => float_to_json(f),
        Value::Decimal(d) => {
            if d.is_integer()
                && let Some(i) = d.to_i64()
            {
                return i.into();
            }
            d.to_f64().map(float_to_json).unwrap_or(serde_json::Value::Null)
        }
        Value::Bytes(bytes) => serde_json::Value::Array(bytes.into_iter().map(Into::into).collect()),
        Value::List(items) => serde_json::Value::Array(items.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
        Value::ObjectId(id) => serde_json::Value::String(id.to_string()),
        Value::Object(object) => serde_json::Value::String(object.object_id().to_string()),
        Value::Entity(entity) => serde_json::Value::String(entity.name),
        Value::Endpoint(endpoint) => serde_json::Value::String(endpoint.to_string()),
        Value::Custom(custom) => serde_json::Value::String(format!("{:?}", custom)),
        other => other
            .as_display_string()
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null),
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Decode a JSON-encoded expression tree
pub fn json_to_node(v: serde_json::Value) -> Result<Node, CliError> {
    match v {
        serde_json::Value::Object(obj) => object_to_node(obj),
        other => Ok(Node::scalar(json_to_value(other))),
    }
}

fn object_to_node(mut obj: Map<String, serde_json::Value>) -> Result<Node, CliError> {
    if let Some(op) = obj.remove("op") {
        let keyword = as_str(&op, "op")?.to_string();
        return op_to_node(&keyword, obj);
    }

    let Some((key, value)) = obj.into_iter().next() else {
        return Err(CliError::InvalidTree("empty object".to_string()));
    };

    let node = match key.as_str() {
        "path" => Node::path(as_str(&value, "path")?)?,
        "db" => Node::db_path(as_str(&value, "db")?)?,
        "dbid" => Node::dbid_path(as_str(&value, "dbid")?)?,
        "param" => Node::param(as_str(&value, "param")?),
        "list" => Node::list(args(Some(value))?)?,
        "date" => Node::scalar(parse_temporal(&value, "date", |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Value::Date)
        })?),
        "time" => Node::scalar(parse_temporal(&value, "time", |s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S").map(Value::Time)
        })?),
        "timestamp" => Node::scalar(parse_temporal(&value, "timestamp", |s| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(Value::Timestamp)
        })?),
        other => return Err(CliError::InvalidTree(format!("unknown key '{}'", other))),
    };
    Ok(node)
}

fn op_to_node(keyword: &str, mut obj: Map<String, serde_json::Value>) -> Result<Node, CliError> {
    let operands = args(obj.remove("args"))?;

    let name = || -> Result<String, CliError> {
        obj.get("name")
            .map(|n| as_str(n, "name").map(str::to_string))
            .unwrap_or_else(|| Err(CliError::InvalidTree(format!("'{}' requires a name", keyword))))
    };

    let kind = match keyword {
        "fn" => NodeKind::FunctionCall(name()?),
        "op" => NodeKind::CustomOperator(name()?),
        "agg" => NodeKind::CustomAggregate(name()?),
        "subquery" => {
            let entity = obj
                .get("entity")
                .ok_or_else(|| CliError::InvalidTree("'subquery' requires an entity".to_string()))?;
            let select = match obj.get("select") {
                Some(select) => Some(Path::parse(as_str(select, "select")?)?),
                None => None,
            };
            NodeKind::Subquery(SubqueryTarget {
                entity: as_str(entity, "entity")?.to_string(),
                select,
            })
        }
        "count" if operands.is_empty() => return Ok(Node::count_all()),
        other => NodeKind::from_keyword(other)
            .ok_or_else(|| CliError::InvalidTree(format!("unknown operator '{}'", other)))?,
    };

    let node = Node::new(kind, operands)?;
    match obj.get("escape") {
        Some(escape) => {
            let mut chars = as_str(escape, "escape")?.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(node.with_escape(c)?),
                _ => Err(CliError::InvalidTree("escape must be one character".to_string())),
            }
        }
        None => Ok(node),
    }
}

fn args(value: Option<serde_json::Value>) -> Result<Vec<Node>, CliError> {
    match value {
        None => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items.into_iter().map(json_to_node).collect(),
        Some(_) => Err(CliError::InvalidTree("'args' must be an array".to_string())),
    }
}

fn as_str<'a>(value: &'a serde_json::Value, key: &str) -> Result<&'a str, CliError> {
    value
        .as_str()
        .ok_or_else(|| CliError::InvalidTree(format!("'{}' must be a string", key)))
}

fn parse_temporal<F>(value: &serde_json::Value, key: &str, parse: F) -> Result<Value, CliError>
where
    F: FnOnce(&str) -> Result<Value, chrono::ParseError>,
{
    let text = as_str(value, key)?;
    parse(text).map_err(|e| CliError::InvalidTree(format!("invalid {} '{}': {}", key, text, e)))
}
