//! Operator and function spellings of each node kind in the two textual
//! forms.

use crate::ast::NodeKind;

/// How a kind is written out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spelling {
    /// `a op b op c`
    Infix(&'static str),
    /// `op a`
    Prefix(&'static str),
    /// `name(a, b)`
    Function(&'static str),
}

impl NodeKind {
    /// Spelling in the canonical form. `None` for leaves and kinds with a
    /// bespoke layout (BETWEEN, LIKE, CASE, subquery, custom escapes).
    pub fn canonical_spelling(&self) -> Option<Spelling> {
        use NodeKind::*;
        use Spelling::*;
        let spelling = match self {
            And => Infix("and"),
            Or => Infix("or"),
            Not => Prefix("not "),
            Equal => Infix("="),
            NotEqual => Infix("!="),
            LessThan => Infix("<"),
            LessOrEqual => Infix("<="),
            GreaterThan => Infix(">"),
            GreaterOrEqual => Infix(">="),
            In => Infix("in"),
            NotIn => Infix("not in"),
            Add => Infix("+"),
            Subtract => Infix("-"),
            Multiply => Infix("*"),
            Divide => Infix("/"),
            Negate => Prefix("-"),
            BitwiseNot => Prefix("~"),
            BitwiseAnd => Infix("&"),
            BitwiseOr => Infix("|"),
            BitwiseXor => Infix("^"),
            BitwiseLeftShift => Infix("<<"),
            BitwiseRightShift => Infix(">>"),
            Exists => Prefix("exists "),
            NotExists => Prefix("not exists "),
            _ => Function(self.function_name()?),
        };
        Some(spelling)
    }

    /// Spelling in the portable form. `None` where the form has no spelling
    /// or the layout is bespoke.
    pub fn portable_spelling(&self) -> Option<Spelling> {
        use NodeKind::*;
        use Spelling::*;
        let spelling = match self {
            NotEqual => Infix("<>"),
            Exists => Prefix("exists "),
            NotExists => Prefix("not exists "),
            Length => Function("length"),
            Locate => Function("locate"),
            BitwiseNot | BitwiseAnd | BitwiseOr | BitwiseXor | BitwiseLeftShift
            | BitwiseRightShift => return None,
            Extract(_) => return None,
            _ => return self.canonical_spelling(),
        };
        Some(spelling)
    }

    /// Function-call name shared by both forms
    pub fn function_name(&self) -> Option<&'static str> {
        use NodeKind::*;
        let name = match self {
            Concat => "concat",
            Substring => "substring",
            Trim => "trim",
            Lower => "lower",
            Upper => "upper",
            Length => "length",
            Locate => "locate",
            Abs => "abs",
            Sqrt => "sqrt",
            Mod => "mod",
            Extract(part) => part.name(),
            Count => "count",
            Distinct => "distinct",
            Min => "min",
            Max => "max",
            Avg => "avg",
            Sum => "sum",
            Any => "any",
            All => "all",
            CurrentDate => "currentDate",
            CurrentTime => "currentTime",
            CurrentTimestamp => "now",
            _ => return None,
        };
        Some(name)
    }

    /// Operator kind for a keyword or symbol, as used by the JSON tree codec.
    ///
    /// Covers every kind without scalar state plus the date parts; LIKE
    /// kinds come back without an escape character.
    pub fn from_keyword(keyword: &str) -> Option<NodeKind> {
        use NodeKind::*;
        let kind = match keyword {
            "and" => And,
            "or" => Or,
            "not" => Not,
            "=" => Equal,
            "!=" | "<>" => NotEqual,
            "<" => LessThan,
            "<=" => LessOrEqual,
            ">" => GreaterThan,
            ">=" => GreaterOrEqual,
            "between" => Between,
            "not between" => NotBetween,
            "in" => In,
            "not in" => NotIn,
            "like" => Like(Default::default()),
            "not like" => NotLike(Default::default()),
            "likeIgnoreCase" => LikeIgnoreCase(Default::default()),
            "not likeIgnoreCase" => NotLikeIgnoreCase(Default::default()),
            "exists" => Exists,
            "not exists" => NotExists,
            "list" => List,
            "+" => Add,
            "-" => Subtract,
            "*" => Multiply,
            "/" => Divide,
            "neg" => Negate,
            "~" => BitwiseNot,
            "&" => BitwiseAnd,
            "|" => BitwiseOr,
            "^" => BitwiseXor,
            "<<" => BitwiseLeftShift,
            ">>" => BitwiseRightShift,
            "case" => CaseWhen,
            "when" => When,
            "then" => Then,
            "else" => Else,
            "enclosing" => EnclosingObject,
            "true" => True,
            "false" => False,
            "asterisk" => Asterisk,
            other => {
                return [
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
                    Count,
                    Distinct,
                    Min,
                    Max,
                    Avg,
                    Sum,
                    Any,
                    All,
                    CurrentDate,
                    CurrentTime,
                    CurrentTimestamp,
                ]
                .into_iter()
                .find(|k| k.function_name() == Some(other))
                .or_else(|| crate::ast::DatePart::from_name(other).map(Extract));
            }
        };
        Some(kind)
    }
}
