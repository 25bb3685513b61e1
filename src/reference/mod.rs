//! Package reference layer
//! - prefix.rs: tag prefix matching
//! - parser.rs: OCI package reference parsing
//! - types.rs: parsed descriptor types

pub mod parser;
pub mod prefix;
pub mod types;

pub use parser::{ReferenceError, ReferenceParser};
pub use prefix::TagPrefixes;
pub use types::{PluginDescriptor, PluginUpdate};
