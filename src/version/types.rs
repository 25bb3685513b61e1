//! Remote package index types

use chrono::{DateTime, Utc};

use crate::version::encoding::EncodedVersion;

/// One tagged version observed at the remote package index.
///
/// Constructed per API response item and discarded after the comparison
/// pass that selects the latest version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersionEntry {
    /// Version name as reported by the index (usually a digest)
    pub name: String,
    /// Version decoded from the container tag, prefix stripped
    pub version: EncodedVersion,
    /// When the version was published
    pub created_at: DateTime<Utc>,
    /// Release-channel prefix the container tag matched
    pub matched_prefix: String,
}
