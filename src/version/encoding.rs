//! Dual-version encoding used inside container tags
//!
//! A tag body is either a single version number (`1.2.3`) or two version
//! numbers joined by [`VERSION_SEPARATOR`] (`1.2.3__0.1.0`), used when a
//! plugin tracks two co-versioned artifacts. The separator cannot occur
//! inside a valid version number, so splitting on it is unambiguous.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

use crate::version::error::VersionError;

/// Separator joining the primary and secondary version inside a tag
pub const VERSION_SEPARATOR: &str = "__";

/// A single version number that remembers its original spelling.
///
/// Ordering and equality use the parsed value; `Display` returns the exact
/// input text so that rewrites reproduce the file content byte-for-byte.
/// Partial versions ("1.2") and compact pre-release forms ("1.0.0rc1") are
/// normalized for comparison only, never for display.
#[derive(Debug, Clone)]
pub struct VersionNumber {
    raw: String,
    parsed: Version,
}

impl VersionNumber {
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let parsed =
            parse_version(text).ok_or_else(|| VersionError::Invalid(text.to_string()))?;
        Ok(Self {
            raw: text.to_string(),
            parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl Eq for VersionNumber {}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

/// Parse a version string into a semver::Version, normalizing lenient forms.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros, and
/// compact pre-release suffixes like "1.0.0rc1" by inserting the `-`
/// separator semver expects.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
/// - "1.2.3rc1" -> Version(1, 2, 3, pre: "rc1")
fn parse_version(version: &str) -> Option<Version> {
    let (numeric, suffix) = split_suffix(version);

    let parts: Vec<&str> = numeric.split('.').collect();
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        3 => numeric.to_string(),
        _ => return None,
    };

    let full = if suffix.is_empty() || suffix.starts_with('-') || suffix.starts_with('+') {
        format!("{normalized}{suffix}")
    } else {
        format!("{normalized}-{suffix}")
    };
    Version::parse(&full).ok()
}

/// Split at the first character that is neither a digit nor a dot.
fn split_suffix(version: &str) -> (&str, &str) {
    match version.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    }
}

/// A primary version with an optional secondary version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVersion {
    pub primary: VersionNumber,
    pub secondary: Option<VersionNumber>,
}

impl EncodedVersion {
    pub fn new(primary: VersionNumber, secondary: Option<VersionNumber>) -> Self {
        Self { primary, secondary }
    }

    /// Decode a tag body into a primary and optional secondary version.
    ///
    /// A trailing separator with nothing after it is treated as primary
    /// only. More than one separator occurrence is a malformed input and
    /// fails rather than silently truncating.
    pub fn decode(text: &str) -> Result<Self, VersionError> {
        if text.matches(VERSION_SEPARATOR).count() > 1 {
            return Err(VersionError::Malformed(text.to_string()));
        }
        match text.split_once(VERSION_SEPARATOR) {
            None => Ok(Self {
                primary: VersionNumber::parse(text)?,
                secondary: None,
            }),
            Some((primary, secondary)) => Ok(Self {
                primary: VersionNumber::parse(primary)?,
                secondary: if secondary.is_empty() {
                    None
                } else {
                    Some(VersionNumber::parse(secondary)?)
                },
            }),
        }
    }

    pub fn encode(&self) -> String {
        match &self.secondary {
            None => self.primary.to_string(),
            Some(secondary) => format!("{}{}{}", self.primary, VERSION_SEPARATOR, secondary),
        }
    }
}

impl fmt::Display for EncodedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl PartialOrd for EncodedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EncodedVersion {
    /// Primary first; on a tie an absent secondary sorts below a present one.
    fn cmp(&self, other: &Self) -> Ordering {
        self.primary
            .cmp(&other.primary)
            .then_with(|| match (&self.secondary, &other.secondary) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", "1.2.3", None)]
    #[case("1.2.3__0.1.0", "1.2.3", Some("0.1.0"))]
    #[case("1.0.0__", "1.0.0", None)] // trailing separator, nothing after
    #[case("0.1.2", "0.1.2", None)]
    #[case("1.0.0rc1", "1.0.0rc1", None)]
    fn decode_splits_primary_and_secondary(
        #[case] text: &str,
        #[case] primary: &str,
        #[case] secondary: Option<&str>,
    ) {
        let decoded = EncodedVersion::decode(text).unwrap();
        assert_eq!(decoded.primary.as_str(), primary);
        assert_eq!(decoded.secondary.as_deref_str(), secondary);
    }

    trait AsDerefStr {
        fn as_deref_str(&self) -> Option<&str>;
    }

    impl AsDerefStr for Option<VersionNumber> {
        fn as_deref_str(&self) -> Option<&str> {
            self.as_ref().map(VersionNumber::as_str)
        }
    }

    #[test]
    fn decode_fails_on_more_than_one_separator() {
        let result = EncodedVersion::decode("1.0.0__2.0.0__extra");
        assert!(matches!(result, Err(VersionError::Malformed(_))));
    }

    #[test]
    fn decode_fails_on_invalid_version_syntax() {
        assert!(matches!(
            EncodedVersion::decode("not-a-version"),
            Err(VersionError::Invalid(_))
        ));
        assert!(matches!(
            EncodedVersion::decode("1.2.3__bogus..1"),
            Err(VersionError::Invalid(_))
        ));
    }

    #[rstest]
    #[case("1.2.3")]
    #[case("1.2.3__0.1.0")]
    #[case("1.0.0rc1")]
    #[case("1.0.0rc1__0.2.0")]
    #[case("1.2")] // partial versions keep their spelling
    fn encode_round_trips_exactly(#[case] text: &str) {
        let decoded = EncodedVersion::decode(text).unwrap();
        assert_eq!(decoded.encode(), text);
    }

    #[test]
    fn trailing_separator_is_dropped_on_encode() {
        let decoded = EncodedVersion::decode("1.0.0__").unwrap();
        assert_eq!(decoded.encode(), "1.0.0");
    }

    #[rstest]
    #[case("1.2.0", "1.1.0", Ordering::Greater)]
    #[case("1.1.0", "1.1.0", Ordering::Equal)]
    #[case("1.0.0", "1.1.0", Ordering::Less)]
    #[case("1.0.0rc1", "1.0.0", Ordering::Less)] // pre-release below release
    #[case("1.0.0rc2", "1.0.0rc1", Ordering::Greater)]
    #[case("1.10.0", "1.9.0", Ordering::Greater)]
    #[case("1.0.0__0.1.0", "1.0.0", Ordering::Greater)] // present beats absent
    #[case("1.0.0", "1.0.0__0.1.0", Ordering::Less)]
    #[case("1.0.0__0.2.0", "1.0.0__0.1.0", Ordering::Greater)]
    #[case("1.2", "1.2.0", Ordering::Equal)] // normalization for ordering only
    fn ordering_compares_primary_then_secondary(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        let a = EncodedVersion::decode(a).unwrap();
        let b = EncodedVersion::decode(b).unwrap();
        assert_eq!(a.cmp(&b), expected);
    }
}
