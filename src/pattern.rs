//! Store wildcard patterns (`%`, `_`) compiled to regular expressions.
//!
//! `%` matches any run of characters and `_` exactly one; every other
//! character matches itself. An optional escape character makes the
//! following character literal, so `100!%` with escape `!` matches the text
//! `100%` only.

use log::debug;
use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};

use crate::error::{ExpressionError, Result};

/// Compute-once holder for the compiled pattern of one LIKE node.
///
/// Concurrent first matches race to compile; exactly one result is stored.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    cell: OnceCell<Regex>,
}

impl PatternCache {
    /// The compiled pattern, compiling it on first use
    pub fn get_or_compile(
        &self,
        pattern: &str,
        ignore_case: bool,
        escape: Option<char>,
    ) -> Result<&Regex> {
        self.cell
            .get_or_try_init(|| compile(pattern, ignore_case, escape))
    }

    pub fn is_compiled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Drops the compiled pattern
    pub fn invalidate(&mut self) {
        self.cell = OnceCell::new();
    }
}

/// Translates a wildcard pattern into anchored regular expression source.
///
/// # Examples
///
/// ```
/// use orm_expr::pattern::to_regex_source;
///
/// assert_eq!(to_regex_source("a%b_c", None), "^a.*b.c$");
/// assert_eq!(to_regex_source("100!%", Some('!')), "^100%$");
/// assert_eq!(to_regex_source("a.b", None), r"^a\.b$");
/// ```
pub fn to_regex_source(pattern: &str, escape: Option<char>) -> String {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            if let Some(next) = chars.next() {
                push_literal(&mut source, next);
            }
            continue;
        }
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => push_literal(&mut source, other),
        }
    }

    source.push('$');
    source
}

fn push_literal(source: &mut String, c: char) {
    let mut buf = [0u8; 4];
    source.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Compiles a wildcard pattern. `?` is rejected as an escape character.
pub fn compile(pattern: &str, ignore_case: bool, escape: Option<char>) -> Result<Regex> {
    if escape == Some('?') {
        return Err(ExpressionError::IllegalEscape {
            escape: '?',
            reason: "reserved for positional parameters",
        });
    }

    let source = to_regex_source(pattern, escape);
    debug!(
        "compiling pattern '{}' as /{}/ (ignore case: {})",
        pattern, source, ignore_case
    );
    let regex = RegexBuilder::new(&source)
        .case_insensitive(ignore_case)
        .dot_matches_new_line(true)
        .build()?;
    Ok(regex)
}

/// One-off match without caching
pub fn matches(subject: &str, pattern: &str, ignore_case: bool, escape: Option<char>) -> Result<bool> {
    Ok(compile(pattern, ignore_case, escape)?.is_match(subject))
}
