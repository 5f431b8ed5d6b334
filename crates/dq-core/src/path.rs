//! # Field Paths
//!
//! A [`Path`] is the dot-separated address of a column. A single segment
//! names a column on the queried record; more segments cross a relation
//! (`user.email`), and join resolution is left to the query engine.

use serde::{Serialize, Serializer};
use std::fmt;

/// Non-empty sequence of non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Split a dotted string into a path. Returns `None` when the string is
    /// empty or any segment between dots is empty.
    pub fn parse(dotted: &str) -> Option<Self> {
        let segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        Self::from_segments(segments)
    }

    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return None;
        }
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a parsed path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single segment of an unqualified path.
    pub fn single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub(crate) fn single_mut(&mut self) -> Option<&mut String> {
        match self.0.as_mut_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Qualified column name as the query engine addresses it.
    pub fn column(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_dots() {
        let p = Path::parse("user.address.city").unwrap();
        assert_eq!(p.segments(), ["user", "address", "city"]);
        assert_eq!(p.column(), "user.address.city");
        assert_eq!(p.single(), None);
    }

    #[test]
    fn test_single_segment() {
        let p = Path::parse("age").unwrap();
        assert_eq!(p.single(), Some("age"));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(Path::parse("").is_none());
        assert!(Path::parse("user.").is_none());
        assert!(Path::parse(".email").is_none());
        assert!(Path::parse("a..b").is_none());
    }
}
