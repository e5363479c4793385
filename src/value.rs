use std::{
    any::Any,
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    context::Persistent,
    metadata::{Endpoint, EntityRef},
    registry,
};

/// A runtime value flowing through expression evaluation.
///
/// Literal leaves carry values, path leaves resolve to values, and every
/// node kind produces one. Whole numbers keep their width so that the
/// evaluator registry can widen them along a fixed ladder
/// (byte, short, int, long, big-integer) before comparing.
///
/// # Examples
///
/// ```
/// use orm_expr::Value;
///
/// let short = Value::Short(5);
/// let long = Value::Long(5);
///
/// // structural equality keeps the width...
/// assert_ne!(short, long);
/// // ...while expression equality widens both sides
/// assert!(orm_expr::registry::evaluator_for(&short).equals(&short, &long));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent / unknown
    Null,

    Boolean(bool),

    // Whole-number ladder
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    /// Arbitrary-width whole number, held as 128 bits
    BigInt(i128),

    // Floating point
    Float(f32),
    Double(f64),

    /// Exact decimal; never compared through floating point
    Decimal(Decimal),

    Char(char),
    String(String),

    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),

    /// Typed enum constant
    Enum(EnumValue),

    Bytes(Vec<u8>),

    /// Ordered sequence (to-many relationship values, IN lists, etc.)
    List(Vec<Value>),

    /// Map-like subject or snapshot
    Map(HashMap<String, Value>),

    /// Identity key of a persistent object
    ObjectId(ObjectId),

    /// Handle to a persistent object, possibly attached to a context
    Object(Arc<dyn Persistent>),

    /// Entity metadata handle (schema only, no data)
    Entity(EntityRef),

    /// Attribute or relationship resolved against metadata
    Endpoint(Endpoint),

    /// Caller-defined value type
    Custom(Arc<dyn CustomValue>),
}

/// A typed enum constant, e.g. `PaintingStatus.SOLD`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub name: String,
    pub ordinal: u32,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>, ordinal: u32) -> Self {
        EnumValue {
            type_name: type_name.into(),
            name: name.into(),
            ordinal,
        }
    }
}

/// Identity key uniquely identifying a persistent entity instance.
///
/// Keys may span several columns; the key map is ordered by column name so
/// that rendering and hashing are stable.
#[derive(Debug, Clone)]
pub struct ObjectId {
    pub entity: String,
    pub key: BTreeMap<String, Value>,
}

impl ObjectId {
    pub fn new(entity: impl Into<String>) -> Self {
        ObjectId {
            entity: entity.into(),
            key: BTreeMap::new(),
        }
    }

    /// Single-column key, the common case
    pub fn single(entity: impl Into<String>, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut id = ObjectId::new(entity);
        id.key.insert(column.into(), value.into());
        id
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key.insert(column.into(), value.into());
        self
    }

    pub fn is_single_column(&self) -> bool {
        self.key.len() == 1
    }

    /// The key value of a single-column id
    pub fn single_value(&self) -> Option<&Value> {
        if self.is_single_column() {
            self.key.values().next()
        } else {
            None
        }
    }

    /// Identity-only snapshot of this key
    pub fn id_snapshot(&self) -> HashMap<String, Value> {
        self.key.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.key.len() == other.key.len()
            && self
                .key
                .iter()
                .all(|(column, value)| match other.key.get(column) {
                    Some(other_value) => registry::evaluator_for(value).equals(value, other_value),
                    None => false,
                })
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ObjectId:{}", self.entity)?;
        for (column, value) in &self.key {
            match value.as_display_string() {
                Some(s) => write!(f, ", {}={}", column, s)?,
                None => write!(f, ", {}={:?}", column, value)?,
            }
        }
        write!(f, ">")
    }
}

/// Extension point for caller-defined value types.
///
/// The evaluator registry resolves a comparison strategy for custom values by
/// walking `type_name` then `ancestry` against registered strategies, then
/// checking the ordering capability, then falling back to equality only.
pub trait CustomValue: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Supertype names, nearest first
    fn ancestry(&self) -> &[&str] {
        &[]
    }

    fn eq_value(&self, other: &Value) -> bool;

    /// Whether values of this type have a natural ordering
    fn is_ordered(&self) -> bool {
        false
    }

    fn compare_value(&self, _other: &Value) -> Option<Ordering> {
        None
    }

    /// Numeric view, for types registered under the numeric strategy
    fn as_number(&self) -> Option<Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl Value {
    /// Human-readable type name, used in error messages and registry keys
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Enum(_) => "enum",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::ObjectId(_) => "objectid",
            Value::Object(_) => "object",
            Value::Entity(_) => "entity",
            Value::Endpoint(_) => "endpoint",
            Value::Custom(_) => "custom",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by logical nodes and `matches`.
    ///
    /// Booleans are themselves, numbers are true when non-zero, strings and
    /// collections when non-empty. Any other non-null value is true.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Byte(n) => *n != 0,
            Value::Short(n) => *n != 0,
            Value::Int(n) => *n != 0,
            Value::Long(n) => *n != 0,
            Value::BigInt(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Double(n) => *n != 0.0,
            Value::Decimal(d) => !d.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            _ => true,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::BigInt(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Decimal(_)
        )
    }

    pub fn is_whole_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::BigInt(_)
        )
    }

    /// Widest whole-number view
    pub fn to_i128(&self) -> Option<i128> {
        match self {
            Value::Byte(n) => Some(*n as i128),
            Value::Short(n) => Some(*n as i128),
            Value::Int(n) => Some(*n as i128),
            Value::Long(n) => Some(*n as i128),
            Value::BigInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Whole-number view used by bitwise nodes; exact integral decimals qualify
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Decimal(d) if d.is_integer() => d.to_i64(),
            Value::Char(c) => Some(*c as i64),
            _ => self.to_i128().and_then(|n| i64::try_from(n).ok()),
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => self.to_i128().map(|n| n as f64),
        }
    }

    /// Exact decimal view used by arithmetic nodes
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Float(n) => Decimal::from_f32(*n),
            Value::Double(n) => Decimal::from_f64(*n),
            _ => self.to_i128().and_then(Decimal::from_i128),
        }
    }

    /// Text view of scalar values; `None` for collections and handles
    pub fn as_display_string(&self) -> Option<String> {
        match self {
            Value::Boolean(b) => Some(b.to_string()),
            Value::Byte(n) => Some(n.to_string()),
            Value::Short(n) => Some(n.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Long(n) => Some(n.to_string()),
            Value::BigInt(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::Double(n) => Some(n.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Char(c) => Some(c.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Enum(e) => Some(e.name.clone()),
            _ => None,
        }
    }

    /// Builds a map value from key/value pairs
    pub fn map<K, V, I>(pairs: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Builds a list value
    pub fn list<V, I>(items: I) -> Value
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl PartialEq for Value {
    /// Structural equality. Expression semantics (numeric widening, decimal
    /// scale, identity keys) live in the evaluator registry instead.
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (ObjectId(a), ObjectId(b)) => a == b,
            (Object(a), Object(b)) => Arc::ptr_eq(a, b) || a.object_id() == b.object_id(),
            (Entity(a), Entity(b)) => a == b,
            (Endpoint(a), Endpoint(b)) => a == b,
            (Custom(a), other) => a.eq_value(other),
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    i128 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    char => Char,
    String => String,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    EnumValue => Enum,
    Vec<Value> => List,
    HashMap<String, Value> => Map,
    ObjectId => ObjectId,
    EntityRef => Entity,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Arc<dyn Persistent>> for Value {
    fn from(v: Arc<dyn Persistent>) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
