//! YAML configuration loading and descriptor extraction
//!
//! The loader owns the filtering responsibility: entries outside the
//! managed registry root or flagged disabled never reach the reference
//! parser, and a malformed entry is logged and skipped rather than failing
//! the batch.

use std::fs;
use std::path::PathBuf;

use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::reference::parser::ReferenceParser;
use crate::reference::types::PluginDescriptor;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config location '{0}': cannot find plugins list")]
    InvalidLocation(String),
}

/// Loads plugin descriptors from the dynamic plugins config file.
pub struct PluginConfigLoader {
    config_path: PathBuf,
    config_location: String,
    registry_prefix: String,
    parser: ReferenceParser,
}

impl PluginConfigLoader {
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            config_location: config.config_location.clone(),
            registry_prefix: config.registry_prefix.clone(),
            parser: ReferenceParser::new(
                config.tag_prefixes.clone(),
                config.package_namespace.clone(),
            ),
        }
    }

    /// Parse the config file and extract the plugin descriptors.
    pub fn load_plugins(&self) -> Result<Vec<PluginDescriptor>, LoadError> {
        debug!(
            "loading plugin descriptors from {}",
            self.config_path.display()
        );
        let content = fs::read_to_string(&self.config_path).map_err(|source| LoadError::Io {
            path: self.config_path.clone(),
            source,
        })?;
        let data: Value = serde_yaml::from_str(&content)?;
        let entries = self.plugins_at_location(&data)?;
        Ok(self.convert_entries(entries))
    }

    /// Navigate the dotted key path down to the plugins list.
    ///
    /// A missing or ill-typed intermediate key is an error; a final value
    /// that is not a sequence yields an empty list.
    fn plugins_at_location<'a>(&self, data: &'a Value) -> Result<&'a [Value], LoadError> {
        let mut current = data;
        for key in self.config_location.split('.') {
            current = current
                .get(key)
                .ok_or_else(|| LoadError::InvalidLocation(self.config_location.clone()))?;
        }
        Ok(current.as_sequence().map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Convert raw plugin entries, skipping out-of-scope and malformed ones.
    fn convert_entries(&self, entries: &[Value]) -> Vec<PluginDescriptor> {
        let mut descriptors = Vec::new();
        for entry in entries {
            let package = entry
                .get("package")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let disabled = entry
                .get("disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            if !package.starts_with(&self.registry_prefix) {
                info!("skipping plugin {package}: not under the managed registry");
                continue;
            }
            if disabled {
                info!("skipping plugin {package}: disabled");
                continue;
            }

            match self.parser.parse(package, disabled) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => warn!("failed to parse package reference {package}: {e}"),
            }
        }
        descriptors
    }
}
