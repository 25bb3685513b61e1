//! Automated version bumps for OCI plugin references in GitOps-managed YAML.
//!
//! The tool scans a YAML configuration file for plugin package references of
//! the form
//! `oci://<registry>/<org>/<repo>/<name>:<prefix><version>[__<version>]!<plugin>`,
//! asks a container-registry-backed package index for newer tagged versions,
//! and opens pull requests that rewrite only the affected tag substrings,
//! leaving every other byte of the file untouched.
//!
//! # Modules
//!
//! - [`config`]: immutable process configuration built from the environment
//! - [`version`]: dual-version encoding, ordering and update decisions
//! - [`reference`]: package reference parsing and tag prefix matching
//! - [`loader`]: YAML loading and descriptor extraction
//! - [`rewrite`]: formatting-preserving in-place tag rewriting
//! - [`github`]: package index and pull request clients
//! - [`updater`]: the outer control loop tying everything together

pub mod config;
pub mod github;
pub mod loader;
pub mod reference;
pub mod rewrite;
pub mod updater;
pub mod version;
