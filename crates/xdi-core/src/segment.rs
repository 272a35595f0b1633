//! Hierarchical identifier syntax: segments composed of sub-segments.
//!
//! A segment like `=markus+email` names a path through the graph. Each
//! sub-segment carries a class symbol (`=`, `@`, `+`, `$`, `!`, `*`) and a
//! literal body, or is a parenthesized cross-reference like
//! `(data:,hello)`. The reserved root segment `()` denotes the empty
//! identifier; concatenation with the root is identity.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// The class symbol of a sub-segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassSymbol {
    /// `=` — personal identity.
    Equals,
    /// `@` — organizational identity.
    At,
    /// `+` — generic class.
    Plus,
    /// `$` — reserved system class.
    Dollar,
    /// `!` — persistent instance.
    Bang,
    /// `*` — reassignable instance.
    Star,
}

impl ClassSymbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '=' => Some(Self::Equals),
            '@' => Some(Self::At),
            '+' => Some(Self::Plus),
            '$' => Some(Self::Dollar),
            '!' => Some(Self::Bang),
            '*' => Some(Self::Star),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Equals => '=',
            Self::At => '@',
            Self::Plus => '+',
            Self::Dollar => '$',
            Self::Bang => '!',
            Self::Star => '*',
        }
    }
}

impl fmt::Display for ClassSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One arc of an identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubSegment {
    /// Class symbol plus literal body, e.g. `=markus` or `+email`.
    /// The body may be empty (`!` alone is the literal predicate).
    Classed { cs: ClassSymbol, body: String },
    /// Parenthesized cross-reference, e.g. `(data:,hello)`.
    /// The empty cross-reference `()` is the root sub-segment.
    CrossReference(String),
}

impl SubSegment {
    pub fn classed(cs: ClassSymbol, body: impl Into<String>) -> Self {
        Self::Classed {
            cs,
            body: body.into(),
        }
    }

    pub fn cross_reference(body: impl Into<String>) -> Self {
        Self::CrossReference(body.into())
    }

    /// The root sub-segment `()`.
    pub fn root() -> Self {
        Self::CrossReference(String::new())
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::CrossReference(body) if body.is_empty())
    }

    pub fn class_symbol(&self) -> Option<ClassSymbol> {
        match self {
            Self::Classed { cs, .. } => Some(*cs),
            Self::CrossReference(_) => None,
        }
    }

    /// A variable sub-segment is a cross-reference whose body starts with
    /// `$`: `($)` matches exactly one sub-segment of the other side,
    /// `($$)` matches one or more, greedily.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::CrossReference(body) if body.starts_with('$'))
    }

    /// Whether a variable sub-segment matches multiple sub-segments.
    pub fn is_multiple_variable(&self) -> bool {
        matches!(self, Self::CrossReference(body) if body.contains("$$"))
    }

    /// Whether this variable sub-segment matches the given sub-segment.
    /// Variables are unconstrained: any concrete sub-segment matches.
    pub fn variable_matches(&self, _other: &SubSegment) -> bool {
        self.is_variable()
    }
}

impl fmt::Display for SubSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classed { cs, body } => write!(f, "{}{}", cs, body),
            Self::CrossReference(body) => write!(f, "({})", body),
        }
    }
}

impl FromStr for SubSegment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut subs = parse_sub_segments(s)?;
        if subs.len() != 1 {
            return Err(ParseError::identifier(s, "expected a single sub-segment"));
        }
        Ok(subs.remove(0))
    }
}

/// A hierarchical identifier: an ordered, non-empty list of sub-segments.
///
/// Equality and hashing are structural. The ordering derived here is
/// plain lexicographic over sub-segments; the length-aware orderings used
/// for prefix dispatch are [`Segment::cmp_by_length_ascending`] and
/// [`Segment::cmp_by_length_descending`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    sub_segments: Vec<SubSegment>,
}

impl Segment {
    /// The reserved root segment `()`.
    pub fn root() -> Self {
        Self {
            sub_segments: vec![SubSegment::root()],
        }
    }

    /// Builds a segment from sub-segments. An empty list yields the root.
    pub fn from_sub_segments(sub_segments: Vec<SubSegment>) -> Self {
        if sub_segments.is_empty() {
            return Self::root();
        }
        Self { sub_segments }
    }

    /// Promotes a single sub-segment to a segment.
    pub fn from_sub_segment(sub_segment: SubSegment) -> Self {
        Self {
            sub_segments: vec![sub_segment],
        }
    }

    pub fn is_root(&self) -> bool {
        self.sub_segments.len() == 1 && self.sub_segments[0].is_root()
    }

    /// Number of sub-segments.
    pub fn len(&self) -> usize {
        self.sub_segments.len()
    }

    pub fn sub_segments(&self) -> &[SubSegment] {
        &self.sub_segments
    }

    pub fn sub_segment(&self, index: usize) -> Option<&SubSegment> {
        self.sub_segments.get(index)
    }

    /// First sub-segment.
    pub fn first(&self) -> &SubSegment {
        &self.sub_segments[0]
    }

    /// Last sub-segment.
    pub fn last(&self) -> &SubSegment {
        &self.sub_segments[self.sub_segments.len() - 1]
    }

    /// The leading sub-segments of this segment.
    ///
    /// For `=a*b*c*d` and 1 this returns `=a`; for -1 it returns `=a*b*c`.
    /// 0 returns the segment unchanged; a result that would be empty
    /// returns the root.
    pub fn parent(&self, n: isize) -> Segment {
        let len = self.len();
        let take = match n.cmp(&0) {
            Ordering::Greater => (n as usize).min(len),
            Ordering::Equal => return self.clone(),
            Ordering::Less => len.saturating_sub(n.unsigned_abs()),
        };
        Segment::from_sub_segments(self.sub_segments[..take].to_vec())
    }

    /// The trailing sub-segments of this segment.
    ///
    /// For `=a*b*c*d` and 1 this returns `*d`; for -1 it returns `*b*c*d`.
    /// 0 returns the segment unchanged; a result that would be empty
    /// returns the root.
    pub fn local(&self, n: isize) -> Segment {
        let len = self.len();
        let skip = match n.cmp(&0) {
            Ordering::Greater => len.saturating_sub(n as usize),
            Ordering::Equal => return self.clone(),
            Ordering::Less => (n.unsigned_abs()).min(len),
        };
        Segment::from_sub_segments(self.sub_segments[skip..].to_vec())
    }

    /// Checks whether this segment starts with `start`, returning the
    /// consumed prefix of `self` on a match.
    ///
    /// The two flags independently enable variable sub-segments on either
    /// side: a variable consumes one sub-segment of the other side, or
    /// greedily several when it is a multiple variable.
    pub fn starts_with(
        &self,
        start: &Segment,
        variables_in_self: bool,
        variables_in_start: bool,
    ) -> Option<Segment> {
        if start.is_root() {
            return Some(Segment::root());
        }
        if self.is_root() {
            return None;
        }

        let mut self_index = 0;
        let mut start_index = 0;

        loop {
            if start_index == start.len() {
                return Some(self.parent(self_index as isize));
            }
            if self_index == self.len() {
                return None;
            }

            let own = &self.sub_segments[self_index];
            let other = &start.sub_segments[start_index];

            if variables_in_self && own.is_variable() {
                if !own.variable_matches(other) {
                    return None;
                }
                start_index += 1;
                if own.is_multiple_variable() {
                    while start_index < start.len()
                        && own.variable_matches(&start.sub_segments[start_index])
                    {
                        start_index += 1;
                    }
                }
                self_index += 1;
                continue;
            }

            if variables_in_start && other.is_variable() {
                if !other.variable_matches(own) {
                    return None;
                }
                self_index += 1;
                if other.is_multiple_variable() {
                    while self_index < self.len()
                        && other.variable_matches(&self.sub_segments[self_index])
                    {
                        self_index += 1;
                    }
                }
                start_index += 1;
                continue;
            }

            if own != other {
                return None;
            }

            self_index += 1;
            start_index += 1;
        }
    }

    /// Checks whether this segment ends with `end`, returning the consumed
    /// suffix of `self` on a match. Symmetric to [`Segment::starts_with`].
    pub fn ends_with(
        &self,
        end: &Segment,
        variables_in_self: bool,
        variables_in_end: bool,
    ) -> Option<Segment> {
        if end.is_root() {
            return Some(Segment::root());
        }
        if self.is_root() {
            return None;
        }

        let mut self_index = self.len() as isize - 1;
        let mut end_index = end.len() as isize - 1;

        loop {
            if end_index == -1 {
                return Some(self.local(-self_index - 1));
            }
            if self_index == -1 {
                return None;
            }

            let own = &self.sub_segments[self_index as usize];
            let other = &end.sub_segments[end_index as usize];

            if variables_in_self && own.is_variable() {
                if !own.variable_matches(other) {
                    return None;
                }
                end_index -= 1;
                if own.is_multiple_variable() {
                    while end_index > -1
                        && own.variable_matches(&end.sub_segments[end_index as usize])
                    {
                        end_index -= 1;
                    }
                }
                self_index -= 1;
                continue;
            }

            if variables_in_end && other.is_variable() {
                if !other.variable_matches(own) {
                    return None;
                }
                self_index -= 1;
                if other.is_multiple_variable() {
                    while self_index > -1
                        && other.variable_matches(&self.sub_segments[self_index as usize])
                    {
                        self_index -= 1;
                    }
                }
                end_index -= 1;
                continue;
            }

            if own != other {
                return None;
            }

            self_index -= 1;
            end_index -= 1;
        }
    }

    /// Subtracts a matching prefix, yielding the remainder.
    ///
    /// For `=a*b*c*d` and `=a*b` this returns `*c*d`; the root when the
    /// whole segment is consumed; `None` when there is no match.
    pub fn remove_start(
        &self,
        start: &Segment,
        variables_in_self: bool,
        variables_in_start: bool,
    ) -> Option<Segment> {
        if start.is_root() {
            return Some(self.clone());
        }
        if self.is_root() {
            return None;
        }
        let matched = self.starts_with(start, variables_in_self, variables_in_start)?;
        if *self == matched {
            return Some(Segment::root());
        }
        Some(self.local(-(matched.len() as isize)))
    }

    /// Subtracts a matching suffix, yielding the remainder. Symmetric to
    /// [`Segment::remove_start`].
    pub fn remove_end(
        &self,
        end: &Segment,
        variables_in_self: bool,
        variables_in_end: bool,
    ) -> Option<Segment> {
        if end.is_root() {
            return Some(self.clone());
        }
        if self.is_root() {
            return None;
        }
        let matched = self.ends_with(end, variables_in_self, variables_in_end)?;
        if *self == matched {
            return Some(Segment::root());
        }
        Some(self.parent(-(matched.len() as isize)))
    }

    /// Concatenates two segments. The root is the identity element.
    pub fn concat(&self, other: &Segment) -> Segment {
        let mut sub_segments = Vec::new();
        if !self.is_root() {
            sub_segments.extend_from_slice(&self.sub_segments);
        }
        if !other.is_root() {
            sub_segments.extend_from_slice(&other.sub_segments);
        }
        Segment::from_sub_segments(sub_segments)
    }

    /// Appends a single sub-segment.
    pub fn with(&self, sub_segment: SubSegment) -> Segment {
        self.concat(&Segment::from_sub_segment(sub_segment))
    }

    /// Orders segments shortest-first, ties broken lexicographically.
    pub fn cmp_by_length_ascending(a: &Segment, b: &Segment) -> Ordering {
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }

    /// Orders segments longest-first, ties broken lexicographically.
    /// This is the ordering key of the contributor map: iteration visits
    /// the most specific registered prefix first.
    pub fn cmp_by_length_descending(a: &Segment, b: &Segment) -> Ordering {
        b.len().cmp(&a.len()).then_with(|| a.cmp(b))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sub_segment in &self.sub_segments {
            write!(f, "{}", sub_segment)?;
        }
        Ok(())
    }
}

impl FromStr for Segment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sub_segments = parse_sub_segments(s)?;
        if sub_segments.is_empty() {
            return Err(ParseError::identifier(s, "empty identifier"));
        }
        Ok(Segment { sub_segments })
    }
}

impl From<SubSegment> for Segment {
    fn from(sub_segment: SubSegment) -> Self {
        Segment::from_sub_segment(sub_segment)
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

impl Serialize for SubSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// Ordering wrapper keying sorted maps longest-segment-first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DescendingSegment(pub Segment);

impl Ord for DescendingSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        Segment::cmp_by_length_descending(&self.0, &other.0)
    }
}

impl PartialOrd for DescendingSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_sub_segments(text: &str) -> Result<Vec<SubSegment>, ParseError> {
    let mut sub_segments = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '(' {
            chars.next();
            let mut depth = 1usize;
            let mut body = String::new();
            for inner in chars.by_ref() {
                match inner {
                    '(' => {
                        depth += 1;
                        body.push(inner);
                    }
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        body.push(inner);
                    }
                    _ => body.push(inner),
                }
            }
            if depth != 0 {
                return Err(ParseError::identifier(text, "unbalanced parentheses"));
            }
            sub_segments.push(SubSegment::CrossReference(body));
        } else if let Some(cs) = ClassSymbol::from_char(c) {
            chars.next();
            let mut body = String::new();
            while let Some(&next) = chars.peek() {
                if next == '(' || next == ')' || ClassSymbol::from_char(next).is_some() {
                    break;
                }
                body.push(next);
                chars.next();
            }
            sub_segments.push(SubSegment::Classed { cs, body });
        } else {
            return Err(ParseError::identifier(
                text,
                format!("unexpected character {:?}", c),
            ));
        }
    }

    Ok(sub_segments)
}
