//! Route pattern matching.
//!
//! # Responsibilities
//! - Split a route pattern into literal and named segments
//! - Match a request path against a compiled pattern (anchored, whole path)
//! - Extract named segment values in pattern order
//!
//! # Design Decisions
//! - A segment is named only when it starts with `:` and has a name after it
//! - Named segments capture exactly one non-empty path component
//! - Paths are compared raw (no percent-decoding)
//! - No regex: one linear pass over both segment lists

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Prefix marking a named segment in a pattern.
pub const PARAM_SIGIL: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern such as `/users/:id`.
///
/// Compilation never fails; anything that is not a named segment is matched
/// literally, character for character.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = source
            .split('/')
            .map(|part| match part.strip_prefix(PARAM_SIGIL) {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(part.to_string()),
            })
            .collect();

        Self { source, segments }
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the named segments, left to right (duplicates included).
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// True when the pattern has no named segments.
    pub fn is_static(&self) -> bool {
        self.param_names().next().is_none()
    }

    /// Match `path` against this pattern.
    ///
    /// Returns the captured parameters, or `None` when the path does not match.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut params = Params::default();
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.as_str(), part);
                }
            }
        }

        // Anchored: leftover path segments mean no match.
        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Path parameters captured by a match, in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Insert a binding. A repeated name keeps its position but takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pattern_requires_exact_match() {
        let pattern = Pattern::parse("/users");
        assert!(pattern.is_static());

        assert!(pattern.matches("/users").is_some());
        assert!(pattern.matches("/users/").is_none());
        assert!(pattern.matches("/user").is_none());
        assert!(pattern.matches("/users/1").is_none());
        assert!(pattern.matches("users").is_none());
        assert!(pattern.matches("/USERS").is_none()); // Case sensitive
    }

    #[test]
    fn test_root_pattern() {
        let pattern = Pattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_none());
        assert!(pattern.matches("//").is_none());
    }

    #[test]
    fn test_named_segment_binds_value() {
        let pattern = Pattern::parse("/users/:id");
        let params = pattern.matches("/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);

        let params = pattern.matches("/users/a.b-c%2F").unwrap();
        assert_eq!(params.get("id"), Some("a.b-c%2F"));
    }

    #[test]
    fn test_named_segment_is_one_component() {
        let pattern = Pattern::parse("/users/:id");
        assert!(pattern.matches("/users/42/x").is_none());
        assert!(pattern.matches("/users/").is_none());
        assert!(pattern.matches("/users").is_none());
        assert!(pattern.matches("/users//").is_none());
    }

    #[test]
    fn test_multiple_params_in_order() {
        let pattern = Pattern::parse("/orgs/:org/repos/:repo");
        let params = pattern.matches("/orgs/rust-lang/repos/cargo").unwrap();
        let bound: Vec<_> = params.iter().collect();
        assert_eq!(bound, vec![("org", "rust-lang"), ("repo", "cargo")]);
        assert!(pattern.matches("/orgs/rust-lang/teams/cargo").is_none());
    }

    #[test]
    fn test_duplicate_param_name_last_capture_wins() {
        let pattern = Pattern::parse("/:id/x/:id");
        let params = pattern.matches("/first/x/second").unwrap();
        assert_eq!(params.get("id"), Some("second"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_bare_sigil_is_literal() {
        let pattern = Pattern::parse("/time/:");
        assert!(pattern.is_static());
        assert!(pattern.matches("/time/:").is_some());
        assert!(pattern.matches("/time/12").is_none());
    }

    #[test]
    fn test_literal_with_regex_characters() {
        let pattern = Pattern::parse("/files/a.json");
        assert!(pattern.matches("/files/a.json").is_some());
        assert!(pattern.matches("/files/abjson").is_none());
    }

    #[test]
    fn test_params_serialize_as_map() {
        let params = Pattern::parse("/a/:x/:y").matches("/a/1/2").unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({ "x": "1", "y": "2" }));
    }
}
