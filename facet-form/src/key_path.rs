//! Parsing of dotted, indexed form keys such as `Employee.Reports[1].Name`.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// One step of a [`KeyPath`]: a property name, optionally indexed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    /// The property name, exactly as it appeared in the key.
    pub name: String,
    /// The element index, when the segment was written as `name[index]`.
    pub index: Option<usize>,
}

impl Segment {
    /// A plain property segment.
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    /// An indexed property segment (`name[index]`).
    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed form key: an ordered list of [`Segment`]s.
///
/// The empty path is the root; binding with an empty prefix reads keys
/// relative to the target type itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The empty (root) path.
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a flat key.
    ///
    /// `.` separates properties; `[n]` directly after a name marks element `n`
    /// of an indexed collection.
    ///
    /// ```
    /// use facet_form::{KeyPath, Segment};
    ///
    /// let path = KeyPath::parse("Employee.Reports[1].Name").unwrap();
    /// assert_eq!(
    ///     path.segments(),
    ///     &[
    ///         Segment::property("Employee"),
    ///         Segment::indexed("Reports", 1),
    ///         Segment::property("Name"),
    ///     ]
    /// );
    /// assert!(KeyPath::parse("Employee.Reports[one]").is_err());
    /// ```
    pub fn parse(key: &str) -> Result<Self, KeyPathError> {
        if key.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        let mut offset = 0;
        for part in key.split('.') {
            segments.push(parse_segment(key, part, offset)?);
            offset += part.len() + 1;
        }
        Ok(Self { segments })
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Whether `prefix` is a segment-wise prefix of this path (names and indices
    /// must both match, so `Employee.Man` is not a prefix of `Employee.Manager`).
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The segments that follow `prefix`, or `None` if `prefix` doesn't match.
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<&[Segment]> {
        self.segments.strip_prefix(prefix.segments.as_slice())
    }

    /// This path extended by a plain property segment.
    pub fn child(&self, name: &str) -> KeyPath {
        self.join(Segment::property(name))
    }

    /// This path extended by an indexed property segment.
    pub fn indexed(&self, name: &str, index: usize) -> KeyPath {
        self.join(Segment::indexed(name, index))
    }

    fn join(&self, segment: Segment) -> KeyPath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        KeyPath { segments }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for KeyPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

fn parse_segment(key: &str, part: &str, offset: usize) -> Result<Segment, KeyPathError> {
    let error = |at: usize, kind| KeyPathError {
        key: key.to_owned(),
        offset: offset + at,
        kind,
    };

    if part.is_empty() {
        return Err(error(0, KeyPathErrorKind::EmptySegment));
    }

    let Some(open) = part.find('[') else {
        if let Some(close) = part.find(']') {
            return Err(error(close, KeyPathErrorKind::UnbalancedBracket));
        }
        return Ok(Segment::property(part));
    };

    let name = &part[..open];
    if name.is_empty() {
        return Err(error(0, KeyPathErrorKind::EmptySegment));
    }
    if let Some(close) = name.find(']') {
        return Err(error(close, KeyPathErrorKind::UnbalancedBracket));
    }

    let rest = &part[open + 1..];
    let Some(close) = rest.find(']') else {
        return Err(error(open, KeyPathErrorKind::UnbalancedBracket));
    };

    let digits = &rest[..close];
    let index = match digits.parse::<usize>() {
        Ok(index) if !digits.starts_with('+') => index,
        _ => return Err(error(open + 1, KeyPathErrorKind::InvalidIndex)),
    };

    let trailing_at = open + 1 + close + 1;
    match &part[trailing_at..] {
        "" => Ok(Segment::indexed(name, index)),
        trailing if trailing.starts_with('[') => {
            Err(error(trailing_at, KeyPathErrorKind::NestedIndex))
        }
        _ => Err(error(trailing_at, KeyPathErrorKind::TrailingCharacters)),
    }
}

/// A key that couldn't be parsed into a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPathError {
    /// The offending key.
    pub key: String,
    /// Byte offset into `key` where parsing failed.
    pub offset: usize,
    /// What went wrong.
    pub kind: KeyPathErrorKind,
}

/// The ways a form key can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyPathErrorKind {
    /// A `.`-separated segment (or the name before `[`) is empty, e.g. `a..b`.
    EmptySegment,
    /// A `[` without its `]`, or a stray `]`.
    UnbalancedBracket,
    /// The text between brackets is not a non-negative integer.
    InvalidIndex,
    /// A second index directly after the first, e.g. `a[0][1]`.
    NestedIndex,
    /// Text after the closing bracket that isn't `.`, e.g. `a[0]b`.
    TrailingCharacters,
}

impl fmt::Display for KeyPathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPathErrorKind::EmptySegment => write!(f, "empty segment"),
            KeyPathErrorKind::UnbalancedBracket => write!(f, "unbalanced bracket"),
            KeyPathErrorKind::InvalidIndex => {
                write!(f, "index is not a non-negative integer")
            }
            KeyPathErrorKind::NestedIndex => write!(f, "nested indices are not supported"),
            KeyPathErrorKind::TrailingCharacters => {
                write!(f, "unexpected characters after index")
            }
        }
    }
}

impl fmt::Display for KeyPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed key `{}` at byte {}: {}",
            self.key, self.offset, self.kind
        )
    }
}

impl core::error::Error for KeyPathError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn kind(key: &str) -> KeyPathErrorKind {
        KeyPath::parse(key).unwrap_err().kind
    }

    #[test]
    fn parses_plain_and_indexed_segments() {
        let path = KeyPath::parse("Employee.Manager.Reports[12].Name").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.segments()[2], Segment::indexed("Reports", 12));
        assert_eq!(path.last(), Some(&Segment::property("Name")));
        assert_eq!(path.to_string(), "Employee.Manager.Reports[12].Name");
    }

    #[test]
    fn empty_key_is_root() {
        let path = KeyPath::parse("").unwrap();
        assert!(path.is_empty());
        assert_eq!(path, KeyPath::root());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(kind("a..b"), KeyPathErrorKind::EmptySegment);
        assert_eq!(kind(".a"), KeyPathErrorKind::EmptySegment);
        assert_eq!(kind("a."), KeyPathErrorKind::EmptySegment);
        assert_eq!(kind("[0].Name"), KeyPathErrorKind::EmptySegment);
        assert_eq!(kind("a[0"), KeyPathErrorKind::UnbalancedBracket);
        assert_eq!(kind("a]0"), KeyPathErrorKind::UnbalancedBracket);
        assert_eq!(kind("a[x]"), KeyPathErrorKind::InvalidIndex);
        assert_eq!(kind("a[-1]"), KeyPathErrorKind::InvalidIndex);
        assert_eq!(kind("a[+1]"), KeyPathErrorKind::InvalidIndex);
        assert_eq!(kind("a[]"), KeyPathErrorKind::InvalidIndex);
        assert_eq!(kind("a[0][1]"), KeyPathErrorKind::NestedIndex);
        assert_eq!(kind("a[0]b"), KeyPathErrorKind::TrailingCharacters);
    }

    #[test]
    fn error_offsets_point_into_the_key() {
        let err = KeyPath::parse("Employee.Reports[x].Name").unwrap_err();
        assert_eq!(err.offset, "Employee.Reports[".len());
        assert_eq!(
            err.to_string(),
            "malformed key `Employee.Reports[x].Name` at byte 17: index is not a non-negative integer"
        );
    }

    #[test]
    fn prefixes_compare_whole_segments() {
        let path = KeyPath::parse("Employee.Manager.Name").unwrap();
        let prefix = KeyPath::parse("Employee.Manager").unwrap();
        let partial = KeyPath::parse("Employee.Man").unwrap();

        assert!(path.starts_with(&prefix));
        assert!(!path.starts_with(&partial));
        assert_eq!(
            path.strip_prefix(&prefix),
            Some(&[Segment::property("Name")][..])
        );
        assert!(path.starts_with(&KeyPath::root()));
    }

    #[test]
    fn indices_are_part_of_the_prefix() {
        let path = KeyPath::parse("Reports[1].Name").unwrap();
        assert!(path.starts_with(&KeyPath::root().indexed("Reports", 1)));
        assert!(!path.starts_with(&KeyPath::root().indexed("Reports", 0)));
        assert!(!path.starts_with(&KeyPath::root().child("Reports")));
    }
}
