//! GitHub API clients
//! - packages.rs: container package version index client
//! - pulls.rs: pull request publishing client

pub mod packages;
pub mod pulls;

pub use packages::{GitHubPackagesClient, RegistryError, VersionIndex};
pub use pulls::{GitHubPullsClient, PublishError, PullRequestPublisher, PullRequestSpec};
