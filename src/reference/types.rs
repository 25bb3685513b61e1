//! Parsed plugin reference types

use crate::version::encoding::EncodedVersion;

/// One plugin reference extracted from the configuration file.
///
/// Created fresh on every load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Registry-relative package path (`<namespace>/<name>`)
    pub package_name: String,
    /// Free-form identifier following the `!` separator
    pub plugin_name: String,
    /// Version currently pinned in the file
    pub current_version: EncodedVersion,
    /// Release-channel prefix the tag carried
    pub tag_prefix: String,
    pub disabled: bool,
}

/// A pending version bump for one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUpdate {
    pub descriptor: PluginDescriptor,
    pub new_version: EncodedVersion,
}
