//! Statements: the `subject/predicate/object` form of graph content.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::segment::{Segment, SubSegment};

const LITERAL_DATA_PREFIX: &str = "data:,";

/// A statement in an XDI graph.
///
/// Three flavors exist: a context-node statement asserts that a parent has
/// a child arc, a relation statement asserts a labeled edge between two
/// context nodes, a literal statement asserts the string value borne by a
/// context node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statement {
    ContextNode { subject: Segment, object: SubSegment },
    Relation {
        subject: Segment,
        predicate: Segment,
        object: Segment,
    },
    Literal { subject: Segment, data: String },
}

impl Statement {
    pub fn context_node(subject: Segment, object: SubSegment) -> Self {
        Self::ContextNode { subject, object }
    }

    pub fn relation(subject: Segment, predicate: Segment, object: Segment) -> Self {
        Self::Relation {
            subject,
            predicate,
            object,
        }
    }

    pub fn literal(subject: Segment, data: impl Into<String>) -> Self {
        Self::Literal {
            subject,
            data: data.into(),
        }
    }

    pub fn subject(&self) -> &Segment {
        match self {
            Self::ContextNode { subject, .. } => subject,
            Self::Relation { subject, .. } => subject,
            Self::Literal { subject, .. } => subject,
        }
    }

    /// The predicate segment: `()` for context-node statements, `!` for
    /// literal statements, the arc label for relations.
    pub fn predicate(&self) -> Segment {
        match self {
            Self::ContextNode { .. } => crate::constants::xri_context(),
            Self::Relation { predicate, .. } => predicate.clone(),
            Self::Literal { .. } => crate::constants::xri_literal(),
        }
    }

    pub fn is_context_node(&self) -> bool {
        matches!(self, Self::ContextNode { .. })
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// The context node this statement is about: the full child path for a
    /// context-node statement, the subject otherwise. This is also the key
    /// prefix dispatch works on.
    pub fn context_node_xri(&self) -> Segment {
        match self {
            Self::ContextNode { subject, object } => subject.with(object.clone()),
            Self::Relation { subject, .. } => subject.clone(),
            Self::Literal { subject, .. } => subject.clone(),
        }
    }

    /// Rebases this statement by subtracting a prefix from its subject.
    /// The subject becomes the root when fully consumed; `None` when the
    /// prefix does not match. Variables are permitted in the prefix.
    pub fn remove_start(&self, prefix: &Segment) -> Option<Statement> {
        let subject = self.subject().remove_start(prefix, false, true)?;
        Some(match self {
            Self::ContextNode { object, .. } => Self::ContextNode {
                subject,
                object: object.clone(),
            },
            Self::Relation {
                predicate, object, ..
            } => Self::Relation {
                subject,
                predicate: predicate.clone(),
                object: object.clone(),
            },
            Self::Literal { data, .. } => Self::Literal {
                subject,
                data: data.clone(),
            },
        })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNode { subject, object } => write!(f, "{}/()/{}", subject, object),
            Self::Relation {
                subject,
                predicate,
                object,
            } => write!(f, "{}/{}/{}", subject, predicate, object),
            Self::Literal { subject, data } => {
                write!(f, "{}/!/({}{})", subject, LITERAL_DATA_PREFIX, data)
            }
        }
    }
}

impl FromStr for Statement {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_top_level(s);
        if parts.len() != 3 {
            return Err(ParseError::statement(
                s,
                "expected subject/predicate/object",
            ));
        }

        let subject: Segment = parts[0]
            .parse()
            .map_err(|e| ParseError::statement(s, format!("bad subject: {}", e)))?;

        match parts[1] {
            "()" => {
                let object: Segment = parts[2]
                    .parse()
                    .map_err(|e| ParseError::statement(s, format!("bad object: {}", e)))?;
                if object.len() != 1 || object.is_root() {
                    return Err(ParseError::statement(
                        s,
                        "context-node object must be a single arc",
                    ));
                }
                Ok(Statement::ContextNode {
                    subject,
                    object: object.first().clone(),
                })
            }
            "!" => {
                let object: SubSegment = parts[2]
                    .parse()
                    .map_err(|e| ParseError::statement(s, format!("bad object: {}", e)))?;
                let SubSegment::CrossReference(body) = object else {
                    return Err(ParseError::statement(s, "literal object must be a data reference"));
                };
                let Some(data) = body.strip_prefix(LITERAL_DATA_PREFIX) else {
                    return Err(ParseError::statement(s, "literal object must be a data reference"));
                };
                Ok(Statement::Literal {
                    subject,
                    data: data.to_string(),
                })
            }
            predicate_text => {
                let predicate: Segment = predicate_text
                    .parse()
                    .map_err(|e| ParseError::statement(s, format!("bad predicate: {}", e)))?;
                let object: Segment = parts[2]
                    .parse()
                    .map_err(|e| ParseError::statement(s, format!("bad object: {}", e)))?;
                Ok(Statement::Relation {
                    subject,
                    predicate,
                    object,
                })
            }
        }
    }
}

impl Serialize for Statement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Statement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// Splits on `/` outside parentheses, so cross-references may carry
/// slashes in their bodies.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    #[test]
    fn parse_literal_statement() {
        let stmt: Statement = "=markus+email/!/(data:,markus.sabadello@gmail.com)"
            .parse()
            .unwrap();
        assert_eq!(
            stmt,
            Statement::literal(seg("=markus+email"), "markus.sabadello@gmail.com")
        );
        assert!(stmt.is_literal());
    }

    #[test]
    fn parse_relation_statement() {
        let stmt: Statement = "=markus/+friend/=neustar*animesh".parse().unwrap();
        assert_eq!(
            stmt,
            Statement::relation(seg("=markus"), seg("+friend"), seg("=neustar*animesh"))
        );
    }

    #[test]
    fn parse_context_node_statement() {
        let stmt: Statement = "=markus/()/+email".parse().unwrap();
        assert_eq!(
            stmt.context_node_xri(),
            seg("=markus+email"),
        );
    }

    #[test]
    fn display_roundtrip() {
        for text in [
            "=markus+email/!/(data:,markus.sabadello@gmail.com)",
            "=markus/+friend/=neustar*animesh",
            "=markus/()/+email",
            "()/()/=markus",
        ] {
            let stmt: Statement = text.parse().unwrap();
            assert_eq!(stmt.to_string(), text);
        }
    }

    #[test]
    fn address_is_not_a_statement() {
        let err = "=alice+email".parse::<Statement>().unwrap_err();
        assert!(err.is_statement());
    }

    #[test]
    fn context_node_xri_for_relation_is_subject() {
        let stmt: Statement = "=alice/+friend/=carol".parse().unwrap();
        assert_eq!(stmt.context_node_xri(), seg("=alice"));
    }

    #[test]
    fn remove_start_rebases_subject() {
        let stmt: Statement = "=alice+email/!/(data:,a@example.org)".parse().unwrap();
        let rebased = stmt.remove_start(&seg("=alice")).unwrap();
        assert_eq!(rebased.subject(), &seg("+email"));

        let fully = stmt.remove_start(&seg("=alice+email")).unwrap();
        assert!(fully.subject().is_root());

        assert!(stmt.remove_start(&seg("=bob")).is_none());
    }

    #[test]
    fn literal_with_slash_in_data() {
        let stmt: Statement = "=a/!/(data:,x/y)".parse().unwrap();
        assert_eq!(stmt, Statement::literal(seg("=a"), "x/y"));
    }
}
