use std::{collections::BTreeMap, fmt};

use crate::error::{ExpressionError, Result};

/// One named step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: String,
    /// Outer-join marker (`name+`)
    pub outer: bool,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Segment {
            name: name.into(),
            outer: false,
        }
    }
}

/// A dotted sequence of named segments with optional declared aliases.
///
/// The empty path is legal and denotes the subject itself. Aliases are
/// declared inline as `segment#alias`; one alias may name only one segment
/// and one segment may carry only one alias.
///
/// # Examples
/// ```text
/// name                    // single segment
/// toArtist.artistName     // relationship traversal
/// paintings+.title        // outer join through paintings
/// paintings#p.title       // aliased segment
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<Segment>,
    /// alias -> segment name
    aliases: BTreeMap<String, String>,
}

impl Path {
    /// The empty ("self") path
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses dotted path text, e.g. `paintings+#p.title`
    pub fn parse(text: &str) -> Result<Path> {
        let mut path = Path::empty();
        if text.is_empty() {
            return Ok(path);
        }

        for part in text.split('.') {
            let (head, alias) = match part.split_once('#') {
                Some((head, alias)) => (head, Some(alias)),
                None => (part, None),
            };
            let (name, outer) = match head.strip_suffix('+') {
                Some(name) => (name, true),
                None => (head, false),
            };

            if name.is_empty() || !name.chars().all(is_segment_char) {
                return Err(ExpressionError::InvalidPath {
                    path: text.to_string(),
                    reason: format!("malformed segment '{}'", part),
                });
            }

            path.segments.push(Segment {
                name: name.to_string(),
                outer,
            });

            if let Some(alias) = alias {
                if alias.is_empty() || !alias.chars().all(is_segment_char) {
                    return Err(ExpressionError::InvalidPath {
                        path: text.to_string(),
                        reason: format!("malformed alias in '{}'", part),
                    });
                }
                path.alias(name, alias)?;
            }
        }

        Ok(path)
    }

    pub fn from_segments<I, S>(names: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            segments: names.into_iter().map(Segment::new).collect(),
            aliases: BTreeMap::new(),
        }
    }

    /// Declares `alias` for `segment`.
    ///
    /// Fails if the alias already names a different segment or the segment
    /// already carries a different alias.
    pub fn alias(&mut self, segment: &str, alias: &str) -> Result<()> {
        if let Some(existing) = self.aliases.get(alias) {
            if existing != segment {
                return Err(ExpressionError::AliasConflict {
                    alias: alias.to_string(),
                    existing: existing.clone(),
                    segment: segment.to_string(),
                });
            }
            return Ok(());
        }

        if let Some(other) = self.alias_of(segment) {
            return Err(ExpressionError::AliasConflict {
                alias: alias.to_string(),
                existing: format!("{}#{}", segment, other),
                segment: segment.to_string(),
            });
        }

        self.aliases.insert(alias.to_string(), segment.to_string());
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The alias declared for a segment
    pub fn alias_of(&self, segment: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, s)| s.as_str() == segment)
            .map(|(alias, _)| alias.as_str())
    }

    /// Segment name with aliases resolved to the segment they stand for
    pub fn resolved_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Segment names with aliases resolved
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| self.resolved_name(&s.name))
    }

    /// Dotted text without alias declarations, keeping outer-join markers
    pub fn plain(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                let name = self.resolved_name(&s.name);
                if s.outer {
                    format!("{}+", name)
                } else {
                    name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl fmt::Display for Path {
    /// Canonical text: segments with outer-join markers and alias declarations
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            if segment.outer {
                write!(f, "+")?;
            }
            if let Some(alias) = self.alias_of(&segment.name) {
                write!(f, "#{}", alias)?;
            }
        }
        Ok(())
    }
}
