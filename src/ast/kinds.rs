use std::mem;

use crate::{ast::Path, pattern::PatternCache, value::Value};

/// The closed set of expression node kinds, with each kind's scalar state.
///
/// Children are not stored here; see [`Node`](crate::ast::Node).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Leaves
    /// Literal value
    Scalar(Value),
    /// Named parameter placeholder (`$name`)
    Parameter(String),
    /// Object path, resolved through object properties
    ObjPath(Path),
    /// Store path (`db:`), resolved through columns and store relationships
    DbPath(Path),
    /// Store identity path (`dbid:`), resolved through the identity key
    DbIdPath(Path),
    True,
    False,
    /// `*`, only as the operand of `count`
    Asterisk,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,

    /// Reference from a subquery to the object enclosing it; one path operand
    EnclosingObject,

    // Logical
    And,
    Or,
    Not,

    // Conditions
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Between,
    NotBetween,
    In,
    NotIn,
    Like(PatternState),
    NotLike(PatternState),
    LikeIgnoreCase(PatternState),
    NotLikeIgnoreCase(PatternState),
    Exists,
    NotExists,

    // Quantifiers over a subquery, right-hand side of a comparison
    Any,
    All,

    /// Literal list, right-hand side of IN
    List,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,

    // Bitwise
    BitwiseNot,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseLeftShift,
    BitwiseRightShift,

    // String and math functions
    Concat,
    Substring,
    Trim,
    Lower,
    Upper,
    Length,
    Locate,
    Abs,
    Sqrt,
    Mod,
    /// Date/time part extraction (`year(x)`, `hour(x)`, ...)
    Extract(DatePart),

    // Aggregates
    Count,
    Distinct,
    Min,
    Max,
    Avg,
    Sum,

    // Escape hatches
    /// `fn("name", args...)`
    FunctionCall(String),
    /// `op("name", args...)`
    CustomOperator(String),
    /// `agg("name", args...)`
    CustomAggregate(String),

    // CASE
    CaseWhen,
    When,
    Then,
    Else,

    /// Subquery over another entity; optional qualifier operand
    Subquery(SubqueryTarget),
}

/// Scalar state of the LIKE family
#[derive(Debug, Clone, Default)]
pub struct PatternState {
    pub escape: Option<char>,
    pub(crate) cache: PatternCache,
}

impl PatternState {
    pub fn new(escape: Option<char>) -> Self {
        PatternState {
            escape,
            cache: PatternCache::default(),
        }
    }
}

impl PartialEq for PatternState {
    fn eq(&self, other: &Self) -> bool {
        self.escape == other.escape
    }
}

/// Target of a subquery node
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryTarget {
    pub entity: String,
    /// Selected column or property; `None` selects whole objects
    pub select: Option<Path>,
}

/// Date/time part selector of [`NodeKind::Extract`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Week,
    DayOfYear,
    Day,
    DayOfMonth,
    DayOfWeek,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    pub const ALL: [DatePart; 10] = [
        DatePart::Year,
        DatePart::Month,
        DatePart::Week,
        DatePart::DayOfYear,
        DatePart::Day,
        DatePart::DayOfMonth,
        DatePart::DayOfWeek,
        DatePart::Hour,
        DatePart::Minute,
        DatePart::Second,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Week => "week",
            DatePart::DayOfYear => "dayOfYear",
            DatePart::Day => "day",
            DatePart::DayOfMonth => "dayOfMonth",
            DatePart::DayOfWeek => "dayOfWeek",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
        }
    }

    pub fn from_name(name: &str) -> Option<DatePart> {
        DatePart::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl NodeKind {
    /// Kind label used in diagnostics
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Scalar(_) => "SCALAR",
            Parameter(_) => "PARAMETER",
            ObjPath(_) => "OBJ_PATH",
            DbPath(_) => "DB_PATH",
            DbIdPath(_) => "DBID_PATH",
            True => "TRUE",
            False => "FALSE",
            Asterisk => "ASTERISK",
            CurrentDate => "CURRENT_DATE",
            CurrentTime => "CURRENT_TIME",
            CurrentTimestamp => "CURRENT_TIMESTAMP",
            EnclosingObject => "ENCLOSING_OBJECT",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            Equal => "EQUAL_TO",
            NotEqual => "NOT_EQUAL_TO",
            LessThan => "LESS_THAN",
            LessOrEqual => "LESS_THAN_EQUAL_TO",
            GreaterThan => "GREATER_THAN",
            GreaterOrEqual => "GREATER_THAN_EQUAL_TO",
            Between => "BETWEEN",
            NotBetween => "NOT_BETWEEN",
            In => "IN",
            NotIn => "NOT_IN",
            Like(_) => "LIKE",
            NotLike(_) => "NOT_LIKE",
            LikeIgnoreCase(_) => "LIKE_IGNORE_CASE",
            NotLikeIgnoreCase(_) => "NOT_LIKE_IGNORE_CASE",
            Exists => "EXISTS",
            NotExists => "NOT_EXISTS",
            Any => "ANY",
            All => "ALL",
            List => "LIST",
            Add => "ADD",
            Subtract => "SUBTRACT",
            Multiply => "MULTIPLY",
            Divide => "DIVIDE",
            Negate => "NEGATIVE",
            BitwiseNot => "BITWISE_NOT",
            BitwiseAnd => "BITWISE_AND",
            BitwiseOr => "BITWISE_OR",
            BitwiseXor => "BITWISE_XOR",
            BitwiseLeftShift => "BITWISE_LEFT_SHIFT",
            BitwiseRightShift => "BITWISE_RIGHT_SHIFT",
            Concat => "CONCAT",
            Substring => "SUBSTRING",
            Trim => "TRIM",
            Lower => "LOWER",
            Upper => "UPPER",
            Length => "LENGTH",
            Locate => "LOCATE",
            Abs => "ABS",
            Sqrt => "SQRT",
            Mod => "MOD",
            Extract(_) => "EXTRACT",
            Count => "COUNT",
            Distinct => "DISTINCT",
            Min => "MIN",
            Max => "MAX",
            Avg => "AVG",
            Sum => "SUM",
            FunctionCall(_) => "FUNCTION_CALL",
            CustomOperator(_) => "CUSTOM_OP",
            CustomAggregate(_) => "CUSTOM_AGGREGATE",
            CaseWhen => "CASE_WHEN",
            When => "WHEN",
            Then => "THEN",
            Else => "ELSE",
            Subquery(_) => "SUBQUERY",
        }
    }

    /// Operand count evaluation needs. Fewer operands evaluate to null,
    /// or to false for conditions.
    pub fn required_operands(&self) -> usize {
        use NodeKind::*;
        match self {
            Not | Negate | BitwiseNot | Trim | Lower | Upper | Length | Abs | Sqrt
            | Extract(_) | Count | Distinct | Min | Max | Avg | Sum | Exists | NotExists
            | Any | All | EnclosingObject | When | Then | Else => 1,
            Equal | NotEqual | LessThan | LessOrEqual | GreaterThan | GreaterOrEqual | In
            | NotIn | Like(_) | NotLike(_) | LikeIgnoreCase(_) | NotLikeIgnoreCase(_)
            | Subtract | Divide | BitwiseAnd | BitwiseOr | BitwiseXor | BitwiseLeftShift
            | BitwiseRightShift | Locate | Mod => 2,
            Between | NotBetween | Substring => 3,
            _ => 0,
        }
    }

    /// Upper bound on operands; `None` for variadic kinds
    pub fn max_operands(&self) -> Option<usize> {
        use NodeKind::*;
        match self {
            Scalar(_) | Parameter(_) | ObjPath(_) | DbPath(_) | DbIdPath(_) | True | False
            | Asterisk | CurrentDate | CurrentTime | CurrentTimestamp => Some(0),
            Subquery(_) => Some(1),
            And | Or | Add | Multiply | Subtract | Divide | List | Concat | FunctionCall(_)
            | CustomOperator(_) | CustomAggregate(_) | CaseWhen => None,
            other => Some(other.required_operands()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.max_operands() == Some(0)
    }

    /// AND / OR / NOT
    pub fn is_logical(&self) -> bool {
        matches!(self, NodeKind::And | NodeKind::Or | NodeKind::Not)
    }

    /// Kinds that must sit at the top of a tree or under a logical node
    pub fn is_condition(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Equal
                | NotEqual
                | LessThan
                | LessOrEqual
                | GreaterThan
                | GreaterOrEqual
                | Between
                | NotBetween
                | In
                | NotIn
                | Like(_)
                | NotLike(_)
                | LikeIgnoreCase(_)
                | NotLikeIgnoreCase(_)
                | Exists
                | NotExists
        )
    }

    /// Binary comparisons that admit an ANY / ALL right-hand side
    pub fn is_comparison(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Equal | NotEqual | LessThan | LessOrEqual | GreaterThan | GreaterOrEqual
        )
    }

    pub fn is_path(&self) -> bool {
        matches!(
            self,
            NodeKind::ObjPath(_) | NodeKind::DbPath(_) | NodeKind::DbIdPath(_)
        )
    }

    pub fn is_aggregate(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Count | Distinct | Min | Max | Avg | Sum | CustomAggregate(_)
        )
    }

    /// Associative kinds that absorb same-kind operands on close
    pub fn is_flattening(&self) -> bool {
        matches!(
            self,
            NodeKind::And | NodeKind::Or | NodeKind::Add | NodeKind::Multiply
        )
    }

    pub fn is_pattern(&self) -> bool {
        self.pattern().is_some()
    }

    pub fn pattern(&self) -> Option<&PatternState> {
        match self {
            NodeKind::Like(p)
            | NodeKind::NotLike(p)
            | NodeKind::LikeIgnoreCase(p)
            | NodeKind::NotLikeIgnoreCase(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn pattern_mut(&mut self) -> Option<&mut PatternState> {
        match self {
            NodeKind::Like(p)
            | NodeKind::NotLike(p)
            | NodeKind::LikeIgnoreCase(p)
            | NodeKind::NotLikeIgnoreCase(p) => Some(p),
            _ => None,
        }
    }

    /// Same kind, ignoring scalar state
    pub fn same_kind(&self, other: &NodeKind) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Copy of the scalar state, with a fresh pattern cache
    pub fn shallow_copy(&self) -> NodeKind {
        match self {
            NodeKind::Like(p) => NodeKind::Like(PatternState::new(p.escape)),
            NodeKind::NotLike(p) => NodeKind::NotLike(PatternState::new(p.escape)),
            NodeKind::LikeIgnoreCase(p) => NodeKind::LikeIgnoreCase(PatternState::new(p.escape)),
            NodeKind::NotLikeIgnoreCase(p) => {
                NodeKind::NotLikeIgnoreCase(PatternState::new(p.escape))
            }
            other => other.clone(),
        }
    }

    /// Directly negated kind, where one exists
    pub fn inverse(&self) -> Option<NodeKind> {
        use NodeKind::*;
        let inverse = match self {
            Equal => NotEqual,
            NotEqual => Equal,
            LessThan => GreaterOrEqual,
            GreaterOrEqual => LessThan,
            GreaterThan => LessOrEqual,
            LessOrEqual => GreaterThan,
            Between => NotBetween,
            NotBetween => Between,
            In => NotIn,
            NotIn => In,
            Like(p) => NotLike(PatternState::new(p.escape)),
            NotLike(p) => Like(PatternState::new(p.escape)),
            LikeIgnoreCase(p) => NotLikeIgnoreCase(PatternState::new(p.escape)),
            NotLikeIgnoreCase(p) => LikeIgnoreCase(PatternState::new(p.escape)),
            Exists => NotExists,
            NotExists => Exists,
            True => False,
            False => True,
            _ => return None,
        };
        Some(inverse)
    }
}
