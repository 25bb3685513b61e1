//! Process configuration for the updater

use std::path::PathBuf;

use crate::reference::prefix::TagPrefixes;

// =============================================================================
// Defaults
// =============================================================================

/// Default path of the dynamic plugins config file
pub const DEFAULT_CONFIG_FILE_PATH: &str = "dynamic-plugins.yaml";

/// Default dotted location of the plugins list inside the file
pub const DEFAULT_CONFIG_LOCATION: &str = "global.dynamic.plugins";

/// Default base branch for pull requests
pub const DEFAULT_BASE_BRANCH: &str = "main";

/// Default base URL for the GitHub API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default page size for package index requests
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Organization owning the plugin container packages
pub const DEFAULT_ORG_NAME: &str = "redhat-developer";

/// Namespace joined with the image name to form the package name
pub const DEFAULT_PACKAGE_NAMESPACE: &str = "rhdh-plugin-export-overlays";

/// Registry root a managed plugin reference must start with
pub const DEFAULT_REGISTRY_PREFIX: &str =
    "oci://ghcr.io/redhat-developer/rhdh-plugin-export-overlays/";

/// Recognized release-channel tag prefixes, in match order
pub const DEFAULT_TAG_PREFIXES: &[&str] = &["next__"];

/// Strategy for publishing updates: one PR per plugin, or one PR for all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStrategy {
    Separate,
    Joint,
}

impl PrStrategy {
    /// Anything other than the exact string "joint" selects the default.
    fn parse(text: &str) -> Self {
        if text == "joint" {
            PrStrategy::Joint
        } else {
            PrStrategy::Separate
        }
    }
}

/// Immutable configuration value passed into each component.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Path of the YAML file holding the plugin references
    pub config_path: PathBuf,
    /// Dotted key path to the plugins list inside the file
    pub config_location: String,
    /// GitHub token used for both the package index and PR creation
    pub github_token: String,
    /// Repository receiving the pull requests (`owner/repo`)
    pub repository: String,
    /// Base branch the pull requests target
    pub base_branch: String,
    pub strategy: PrStrategy,
    /// Maximum number of PRs to create; 0 means unlimited
    pub pr_limit: usize,
    pub verbose: bool,
    pub tag_prefixes: TagPrefixes,
    pub registry_prefix: String,
    pub package_namespace: String,
    pub org: String,
    pub api_base_url: String,
    pub per_page: u32,
}

impl UpdaterConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            config_path: lookup("DYNAMIC_PLUGINS_CONFIG_YAML_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_PATH)),
            config_location: lookup("DYNAMIC_PLUGINS_CONFIG_YAML_LOCATION")
                .unwrap_or_else(|| DEFAULT_CONFIG_LOCATION.to_string()),
            github_token: lookup("GITHUB_TOKEN").unwrap_or_default(),
            repository: lookup("GITHUB_REPOSITORY").unwrap_or_default(),
            base_branch: lookup("GITHUB_REF").unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            strategy: PrStrategy::parse(&lookup("UPDATE_PR_STRATEGY").unwrap_or_default()),
            pr_limit: lookup("PR_CREATION_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            verbose: lookup("VERBOSE")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0)
                > 0,
            tag_prefixes: TagPrefixes::new(
                DEFAULT_TAG_PREFIXES.iter().map(|s| s.to_string()).collect(),
            ),
            registry_prefix: DEFAULT_REGISTRY_PREFIX.to_string(),
            package_namespace: DEFAULT_PACKAGE_NAMESPACE.to_string(),
            org: DEFAULT_ORG_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
