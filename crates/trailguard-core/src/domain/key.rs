//! Cache identity: ordered, typed key tuples.
//!
//! A [`CacheKey`] names one fetchable resource together with every parameter
//! that affects the fetched value, e.g. `["projects", "p1", "results", 1, 50]`.
//! Segments are typed, so the string `"1"` and the integer `1` are different
//! keys, and an absent optional parameter is recorded as
//! [`KeySegment::Absent`] instead of being silently dropped.
//!
//! # Prefix semantics
//!
//! Key `k` starts with prefix `p` when `p` has no more segments than `k` and
//! every segment of `p` equals the segment at the same position in `k`.
//! Invalidating `p` affects every key that starts with `p`, including `p`
//! itself.

use std::fmt;

use serde::Serialize;

/// One element of a [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeySegment {
    /// A textual segment: resource names and string identifiers.
    Str(String),
    /// A numeric segment: page numbers, limits.
    Int(i64),
    /// An optional parameter that was not supplied.
    Absent,
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Str(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Str(value)
    }
}

impl From<&String> for KeySegment {
    fn from(value: &String) -> Self {
        KeySegment::Str(value.clone())
    }
}

impl From<u32> for KeySegment {
    fn from(value: u32) -> Self {
        KeySegment::Int(i64::from(value))
    }
}

impl From<i32> for KeySegment {
    fn from(value: i32) -> Self {
        KeySegment::Int(i64::from(value))
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        KeySegment::Int(value)
    }
}

impl<T: Into<KeySegment>> From<Option<T>> for KeySegment {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeySegment::Absent, Into::into)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Str(s) => write!(f, "{s:?}"),
            KeySegment::Int(n) => write!(f, "{n}"),
            KeySegment::Absent => f.write_str("null"),
        }
    }
}

/// Ordered tuple identifying one cached resource and its parameters.
///
/// Build keys with the [`cache_key!`](crate::cache_key) macro or by chaining
/// [`CacheKey::child`]:
///
/// ```rust
/// use trailguard_core::{cache_key, CacheKey};
///
/// let a = cache_key!["projects", "p1", "results", 1u32, 50u32];
/// let b = CacheKey::new("projects").child("p1").child("results").child(1u32).child(50u32);
/// assert_eq!(a, b);
/// assert!(a.starts_with(&cache_key!["projects"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<KeySegment>);

impl CacheKey {
    /// Creates a single-segment key naming a resource root.
    pub fn new(root: impl Into<KeySegment>) -> Self {
        Self(vec![root.into()])
    }

    /// Creates a key from pre-built segments.
    pub fn from_segments(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Returns a copy of this key extended by one segment.
    #[must_use]
    pub fn child(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// The segments of this key in order.
    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for the empty key, which is a prefix of every key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when `prefix` matches the leading segments of `self`.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str("]")
    }
}

/// Builds a [`CacheKey`] from a comma-separated list of segment values.
///
/// Every value must convert into a [`KeySegment`] (`&str`, `String`,
/// integers, or `Option` of those).
#[macro_export]
macro_rules! cache_key {
    ($($segment:expr),+ $(,)?) => {
        $crate::domain::key::CacheKey::from_segments(vec![
            $($crate::domain::key::KeySegment::from($segment)),+
        ])
    };
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_and_builder_produce_identical_keys() {
        // Arrange / Act
        let from_macro = cache_key!["projects", "p1", "results", 1u32, 50u32];
        let from_builder = CacheKey::new("projects")
            .child("p1")
            .child("results")
            .child(1u32)
            .child(50u32);

        // Assert
        assert_eq!(from_macro, from_builder);
        assert_eq!(from_macro.len(), 5);
    }

    #[test]
    fn test_different_pages_never_collide() {
        let page1 = cache_key!["projects", "p1", "results", 1u32, 50u32];
        let page2 = cache_key!["projects", "p1", "results", 2u32, 50u32];
        assert_ne!(page1, page2);
    }

    #[test]
    fn test_string_and_integer_segments_are_distinct() {
        // "1" as a project id must not alias the page number 1.
        let textual = cache_key!["projects", "1"];
        let numeric = cache_key!["projects", 1u32];
        assert_ne!(textual, numeric);
    }

    #[test]
    fn test_absent_option_is_encoded_explicitly() {
        let task: Option<&str> = None;
        let key = cache_key!["batch-status", "p1", task];
        assert_eq!(key.segments()[2], KeySegment::Absent);
        assert_ne!(key, cache_key!["batch-status", "p1"]);
    }

    #[test]
    fn test_present_option_is_encoded_as_its_value() {
        let key = cache_key!["batch-status", "p1", Some("t1")];
        assert_eq!(key, cache_key!["batch-status", "p1", "t1"]);
    }

    #[test]
    fn test_starts_with_matches_prefix_and_self() {
        let key = cache_key!["projects", "p1", "results", 1u32, 50u32];
        assert!(key.starts_with(&cache_key!["projects"]));
        assert!(key.starts_with(&cache_key!["projects", "p1", "results"]));
        assert!(key.starts_with(&key.clone()));
    }

    #[test]
    fn test_starts_with_rejects_sibling_and_longer_prefix() {
        let key = cache_key!["projects", "p1"];
        assert!(!key.starts_with(&cache_key!["projects", "p2"]));
        assert!(!key.starts_with(&cache_key!["projects", "p1", "results"]));
    }

    #[test]
    fn test_display_renders_json_like_tuple() {
        let key = cache_key!["batch-status", "p1", None::<&str>, 7i64];
        assert_eq!(key.to_string(), r#"["batch-status","p1",null,7]"#);
    }

    #[test]
    fn test_serializes_as_json_array() {
        let key = cache_key!["projects", "p1", 2u32];
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"["projects","p1",2]"#);
    }
}
