//! Version layer: dual-version encoding, ordering, and update decisions
//!
//! A plugin tag carries one or two version numbers joined by a fixed `__`
//! separator (e.g. `1.2.3` or `1.2.3__0.1.0`). This module decodes and
//! re-encodes that representation, defines a total order over it, and
//! decides whether a remote version supersedes the one pinned in the file.
//!
//! # Modules
//!
//! - [`encoding`]: `EncodedVersion` codec and ordering
//! - [`decision`]: `needs_update` and latest-version selection
//! - [`error`]: error types for version parsing and decoding
//! - [`types`]: remote package index types

pub mod decision;
pub mod encoding;
pub mod error;
pub mod types;

pub use decision::{needs_update, select_latest};
pub use encoding::{EncodedVersion, VERSION_SEPARATOR, VersionNumber};
pub use error::VersionError;
pub use types::RemoteVersionEntry;
