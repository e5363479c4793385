//! Type-dispatched comparison strategies used by every comparison node.
//!
//! The strategy for a left-hand value is selected from its runtime type and
//! memoized in a process-wide table. Concurrent first resolutions of the same
//! type may both compute a strategy; the first one inserted wins and every
//! caller sees it.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::value::Value;

/// Tolerance for floating-point equality and ordering
pub const FLOAT_EPSILON: f64 = 1e-7;

/// Built-in comparison strategies, in resolution priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Null left-hand side: equal only to null, never ordered
    Null,
    /// Exact decimal comparison
    Decimal,
    /// Identity-key equality for persistent objects and raw ids
    Persistent,
    /// Cross-width numeric comparison
    Numeric,
    /// Natural ordering plus structural equality
    Ordered,
    /// Structural equality only
    Default,
}

/// Cache key: built-in variant name, or the name of a custom type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Builtin(&'static str),
    Custom(String),
}

impl TypeKey {
    fn of(value: &Value) -> TypeKey {
        match value {
            Value::Custom(custom) => TypeKey::Custom(custom.type_name().to_string()),
            other => TypeKey::Builtin(other.type_name()),
        }
    }
}

/// Comparison strategy resolved for one runtime type
#[derive(Debug, Clone)]
pub struct ValueEvaluator {
    strategy: Strategy,
}

impl ValueEvaluator {
    pub fn new(strategy: Strategy) -> Self {
        ValueEvaluator { strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Null-safe equality: null equals only null
    pub fn equals(&self, lhs: &Value, rhs: &Value) -> bool {
        if rhs.is_null() || lhs.is_null() {
            return lhs.is_null() && rhs.is_null();
        }

        match self.strategy {
            Strategy::Null => false,
            Strategy::Decimal => match (decimal(lhs), decimal(rhs)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Strategy::Persistent => persistent_eq(lhs, rhs),
            Strategy::Numeric => numeric_compare(lhs, rhs) == Some(Ordering::Equal),
            Strategy::Ordered | Strategy::Default => lhs == rhs,
        }
    }

    /// Ordering, or `None` when the operands are incomparable or either is null
    pub fn compare(&self, lhs: &Value, rhs: &Value) -> Option<Ordering> {
        if lhs.is_null() || rhs.is_null() {
            return None;
        }

        match self.strategy {
            Strategy::Decimal => {
                let a = decimal(lhs)?;
                let b = decimal(rhs)?;
                Some(a.cmp(&b))
            }
            Strategy::Numeric => numeric_compare(lhs, rhs),
            Strategy::Ordered => natural_order(lhs, rhs),
            Strategy::Null | Strategy::Persistent | Strategy::Default => None,
        }
    }
}

/// Process-wide memo of strategies per runtime type
pub struct EvaluatorRegistry {
    cache: DashMap<TypeKey, Arc<ValueEvaluator>>,
    /// Strategies registered for custom type names
    registered: RwLock<HashMap<String, Strategy>>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            registered: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a strategy for a custom type name. Custom values whose type
    /// or any ancestor carries this name resolve to it.
    pub fn register(&self, type_name: impl Into<String>, strategy: Strategy) {
        self.registered.write().insert(type_name.into(), strategy);
        // Any custom type may inherit the new registration through its ancestry
        self.cache.retain(|key, _| matches!(key, TypeKey::Builtin(_)));
    }

    /// The strategy for the runtime type of `value`
    pub fn resolve(&self, value: &Value) -> Arc<ValueEvaluator> {
        let key = TypeKey::of(value);

        if let Some(evaluator) = self.cache.get(&key) {
            return Arc::clone(&evaluator);
        }

        let strategy = self.select(value);
        let computed = Arc::new(ValueEvaluator::new(strategy));

        match self.cache.entry(key) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                debug!(
                    "resolved {:?} comparison strategy for {}",
                    strategy,
                    describe(value)
                );
                entry.insert(Arc::clone(&computed));
                computed
            }
        }
    }

    /// Number of runtime types resolved so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn select(&self, value: &Value) -> Strategy {
        match value {
            Value::Null => Strategy::Null,
            Value::Decimal(_) => Strategy::Decimal,
            Value::Object(_) | Value::ObjectId(_) => Strategy::Persistent,
            v if v.is_number() => Strategy::Numeric,
            Value::Custom(custom) => {
                let registered = self.registered.read();
                std::iter::once(custom.type_name())
                    .chain(custom.ancestry().iter().copied())
                    .find_map(|name| registered.get(name).copied())
                    .unwrap_or(if custom.is_ordered() {
                        Strategy::Ordered
                    } else {
                        Strategy::Default
                    })
            }
            Value::Boolean(_)
            | Value::Char(_)
            | Value::String(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::Timestamp(_)
            | Value::Enum(_) => Strategy::Ordered,
            _ => Strategy::Default,
        }
    }
}

static REGISTRY: Lazy<EvaluatorRegistry> = Lazy::new(EvaluatorRegistry::new);

/// The process-wide registry
pub fn registry() -> &'static EvaluatorRegistry {
    &REGISTRY
}

/// The comparison strategy for `value`, from the process-wide registry
pub fn evaluator_for(value: &Value) -> Arc<ValueEvaluator> {
    REGISTRY.resolve(value)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Custom(custom) => format!("custom type '{}'", custom.type_name()),
        other => other.type_name().to_string(),
    }
}

/// Numeric view of a value, unwrapping custom numeric types
fn number(value: &Value) -> Option<Value> {
    match value {
        Value::Custom(custom) => custom.as_number(),
        v if v.is_number() => Some(v.clone()),
        _ => None,
    }
}

fn decimal(value: &Value) -> Option<rust_decimal::Decimal> {
    number(value)?.to_decimal()
}

/// Whole numbers compare on the widest integer; anything involving a
/// decimal compares exactly; the rest through floating point with a
/// tolerance.
fn numeric_compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    let lhs = number(lhs)?;
    let rhs = number(rhs)?;

    if let (Some(a), Some(b)) = (lhs.to_i128(), rhs.to_i128()) {
        return Some(a.cmp(&b));
    }

    if matches!(lhs, Value::Decimal(_)) || matches!(rhs, Value::Decimal(_)) {
        if let (Some(a), Some(b)) = (lhs.to_decimal(), rhs.to_decimal()) {
            return Some(a.cmp(&b));
        }
    }

    let a = lhs.to_f64()?;
    let b = rhs.to_f64()?;
    if (a - b).abs() < FLOAT_EPSILON {
        Some(Ordering::Equal)
    } else {
        a.partial_cmp(&b)
    }
}

fn natural_order(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::String(b)) => Some(a.to_string().as_str().cmp(b.as_str())),
        (Value::String(a), Value::Char(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Timestamp(b)) => Some(a.and_hms_opt(0, 0, 0)?.cmp(b)),
        (Value::Timestamp(a), Value::Date(b)) => Some(a.cmp(&b.and_hms_opt(0, 0, 0)?)),
        (Value::Enum(a), Value::Enum(b)) if a.type_name == b.type_name => {
            Some(a.ordinal.cmp(&b.ordinal))
        }
        (Value::Custom(a), other) => a.compare_value(other),
        _ => None,
    }
}

/// Identity-key equality against another object, a raw id, a snapshot map,
/// or the bare key value of a single-column id
fn persistent_eq(lhs: &Value, rhs: &Value) -> bool {
    let id = match lhs {
        Value::Object(object) => object.object_id(),
        Value::ObjectId(id) => id.clone(),
        _ => return false,
    };

    match rhs {
        Value::Object(object) => id == object.object_id(),
        Value::ObjectId(other) => id == *other,
        Value::Map(snapshot) => {
            !id.key.is_empty()
                && id.key.iter().all(|(column, value)| {
                    snapshot
                        .get(column)
                        .is_some_and(|other| evaluator_for(value).equals(value, other))
                })
        }
        scalar => id
            .single_value()
            .is_some_and(|value| evaluator_for(value).equals(value, scalar)),
    }
}
