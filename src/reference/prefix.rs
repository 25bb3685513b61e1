//! Tag prefix matching
//!
//! Container tags carry a literal release-channel marker in front of the
//! encoded version (e.g. `next__1.2.3`). The recognized markers come from
//! configuration as an ordered list.

/// Ordered, non-empty list of recognized release-channel prefixes.
///
/// When two entries are mutually prefixing (e.g. `"next"` and `"next__"`),
/// the earlier-configured one wins for every tag the longer one would also
/// match. That shadowing is not checked at runtime; configure the list so
/// it cannot happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPrefixes(Vec<String>);

impl TagPrefixes {
    pub fn new(prefixes: Vec<String>) -> Self {
        assert!(!prefixes.is_empty(), "tag prefix list must not be empty");
        Self(prefixes)
    }

    /// Returns the first configured prefix the tag starts with, if any.
    pub fn match_prefix(&self, tag: &str) -> Option<&str> {
        self.0
            .iter()
            .map(String::as_str)
            .find(|prefix| tag.starts_with(prefix))
    }

    /// Default fallback when no prefix matches free text.
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
