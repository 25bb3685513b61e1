//! OCI package reference parsing
//!
//! A reference embeds an image locator and a plugin name:
//!
//! ```text
//! oci://<registry>/<orgPath...>/<name>:<prefix><primary>[__<secondary>]!<pluginName>
//! ```
//!
//! The parser only ever receives candidates the loader already filtered to
//! the managed registry root; filtering is not its responsibility.

use thiserror::Error;

use crate::reference::prefix::TagPrefixes;
use crate::reference::types::PluginDescriptor;
use crate::version::encoding::EncodedVersion;
use crate::version::error::VersionError;

/// Required URI scheme marker for plugin package references
pub const OCI_SCHEME: &str = "oci://";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Missing oci:// scheme in reference: {0}")]
    MissingScheme(String),

    #[error("Missing plugin-name separator '!' in reference: {0}")]
    MissingPluginSeparator(String),

    #[error("Too many path segments ({count}) in reference: {reference}")]
    TooManyPathSegments { reference: String, count: usize },

    #[error("Missing tag in reference: {0}")]
    MissingTag(String),

    #[error("Unrecognized tag prefix in '{tag}' for reference: {reference}")]
    UnrecognizedTagPrefix { reference: String, tag: String },

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Parses package reference strings into [`PluginDescriptor`] values.
pub struct ReferenceParser {
    prefixes: TagPrefixes,
    namespace: String,
}

impl ReferenceParser {
    pub fn new(prefixes: TagPrefixes, namespace: impl Into<String>) -> Self {
        Self {
            prefixes,
            namespace: namespace.into(),
        }
    }

    /// Parse one reference into a descriptor.
    ///
    /// The image locator is split below the registry host; at most three
    /// path segments (up to two org-path components plus the final
    /// `name:tag`) are accepted.
    pub fn parse(&self, reference: &str, disabled: bool) -> Result<PluginDescriptor, ReferenceError> {
        let rest = reference
            .strip_prefix(OCI_SCHEME)
            .ok_or_else(|| ReferenceError::MissingScheme(reference.to_string()))?;

        let (locator, plugin_name) = rest
            .split_once('!')
            .ok_or_else(|| ReferenceError::MissingPluginSeparator(reference.to_string()))?;

        // the first segment is the registry host; the bound applies below it
        let (_, path) = locator.split_once('/').unwrap_or((locator, ""));
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() >= 4 {
            return Err(ReferenceError::TooManyPathSegments {
                reference: reference.to_string(),
                count: segments.len(),
            });
        }

        let name_and_tag = segments.last().copied().unwrap_or_default();
        let (name, raw_tag) = name_and_tag
            .rsplit_once(':')
            .ok_or_else(|| ReferenceError::MissingTag(reference.to_string()))?;

        let prefix = self.prefixes.match_prefix(raw_tag).ok_or_else(|| {
            ReferenceError::UnrecognizedTagPrefix {
                reference: reference.to_string(),
                tag: raw_tag.to_string(),
            }
        })?;

        let current_version = EncodedVersion::decode(&raw_tag[prefix.len()..])?;

        Ok(PluginDescriptor {
            package_name: format!("{}/{}", self.namespace, name),
            plugin_name: plugin_name.to_string(),
            current_version,
            tag_prefix: prefix.to_string(),
            disabled,
        })
    }
}
