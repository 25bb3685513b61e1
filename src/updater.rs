//! Outer control loop: load, compare, rewrite, publish
//!
//! Separate strategy opens one PR per outdated plugin, bounded by the
//! configured PR creation limit; joint strategy batches every update into
//! a single PR. A PR failure is tolerated per plugin in separate mode and
//! fatal in joint mode.

use std::fs;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::{PrStrategy, UpdaterConfig};
use crate::github::packages::{GitHubPackagesClient, VersionIndex};
use crate::github::pulls::{GitHubPullsClient, PullRequestPublisher, PullRequestSpec};
use crate::loader::PluginConfigLoader;
use crate::reference::types::{PluginDescriptor, PluginUpdate};
use crate::rewrite::ConfigRewriter;
use crate::version::decision::{needs_update, select_latest};
use crate::version::encoding::EncodedVersion;

/// Branch name used by the joint strategy
const BULK_BRANCH_NAME: &str = "update-plugins-batch";

fn update_branch_name(plugin_name: &str, version: &EncodedVersion) -> String {
    format!("update-{}-{}", plugin_name, version.encode())
}

fn update_title(plugin_name: &str, version: &EncodedVersion) -> String {
    format!(
        "chore(`plugin-gitops-updater`) Update `{}` to version `{}`",
        plugin_name,
        version.encode()
    )
}

fn update_body(descriptor: &PluginDescriptor, version: &EncodedVersion) -> String {
    format!(
        "## Plugin Update\n\n\
         **Plugin**: `{}`\n\
         **Current Version**: `{}`\n\
         **New Version**: `{}`\n\n\
         This PR updates the plugin to the latest version.\n",
        descriptor.plugin_name,
        descriptor.current_version.encode(),
        version.encode()
    )
}

fn bulk_title(count: usize) -> String {
    format!("chore(`plugin-gitops-updater`) Update {count} plugins")
}

fn bulk_body(updates: &[PluginUpdate]) -> String {
    let mut body = format!(
        "## Batch Plugin Update\n\n\
         This PR updates {} plugins to their latest versions:\n\n",
        updates.len()
    );
    for update in updates {
        body.push_str(&format!(
            "- **{}**: `{}` -> `{}`\n",
            update.descriptor.plugin_name,
            update.descriptor.current_version.encode(),
            update.new_version.encode()
        ));
    }
    body
}

/// Run one full update cycle and return the number of PRs created.
pub async fn run(config: &UpdaterConfig) -> anyhow::Result<usize> {
    if config.repository.is_empty() {
        anyhow::bail!("GITHUB_REPOSITORY environment variable is required");
    }
    if config.github_token.is_empty() {
        anyhow::bail!("GITHUB_TOKEN environment variable is required");
    }

    let loader = PluginConfigLoader::new(config);
    let plugins = loader.load_plugins()?;
    info!("found {} plugins to check for updates", plugins.len());

    let raw_text = fs::read_to_string(&config.config_path)
        .with_context(|| format!("failed to read {}", config.config_path.display()))?;

    let index = GitHubPackagesClient::new(
        &config.api_base_url,
        &config.github_token,
        &config.org,
        config.per_page,
        config.tag_prefixes.clone(),
    );
    let publisher = GitHubPullsClient::new(
        &config.api_base_url,
        &config.github_token,
        config.strategy,
    );

    run_with(config, &plugins, &raw_text, &index, &publisher).await
}

/// The control loop proper, generic over the two remote collaborators.
pub(crate) async fn run_with(
    config: &UpdaterConfig,
    plugins: &[PluginDescriptor],
    raw_text: &str,
    index: &dyn VersionIndex,
    publisher: &dyn PullRequestPublisher,
) -> anyhow::Result<usize> {
    let rewriter = ConfigRewriter::new(config.tag_prefixes.clone());
    let file_path = config.config_path.display().to_string();

    let mut pending: Vec<PluginUpdate> = Vec::new();
    let mut prs_created = 0usize;

    for plugin in plugins {
        info!("processing plugin: {}", plugin.plugin_name);

        let versions = index.fetch_versions(&plugin.package_name).await?;
        if versions.is_empty() {
            warn!(
                "no versions found for package {}, skipping",
                plugin.package_name
            );
            continue;
        }

        let Some(latest) = select_latest(&versions) else {
            continue;
        };

        if !needs_update(&latest.version, &plugin.current_version) {
            info!(
                "plugin {} is up-to-date (version: {})",
                plugin.plugin_name,
                plugin.current_version.encode()
            );
            continue;
        }

        info!(
            "newer version found for plugin {}: {} (current: {})",
            plugin.plugin_name,
            latest.version.encode(),
            plugin.current_version.encode()
        );

        if config.strategy == PrStrategy::Joint {
            debug!("queueing plugin update for joint PR");
            pending.push(PluginUpdate {
                descriptor: plugin.clone(),
                new_version: latest.version.clone(),
            });
            continue;
        }

        if config.pr_limit > 0 && prs_created >= config.pr_limit {
            warn!(
                "reached the PR creation limit of {}, stopping",
                config.pr_limit
            );
            break;
        }

        let updated = rewriter.rewrite_one(raw_text, plugin, &latest.version);
        let spec = PullRequestSpec {
            repository: config.repository.clone(),
            file_path: file_path.clone(),
            new_content: updated,
            branch_name: update_branch_name(&plugin.plugin_name, &latest.version),
            title: update_title(&plugin.plugin_name, &latest.version),
            body: update_body(plugin, &latest.version),
            base_branch: config.base_branch.clone(),
        };
        match publisher.create_pull_request(&spec).await {
            Ok(url) => {
                info!("created PR: {url}");
                prs_created += 1;
            }
            Err(e) => warn!("failed to create PR for {}: {e}", plugin.plugin_name),
        }
    }

    if !pending.is_empty() {
        info!("creating joint PR for {} plugin updates", pending.len());
        let updated = rewriter.rewrite_many(raw_text, &pending);
        let spec = PullRequestSpec {
            repository: config.repository.clone(),
            file_path,
            new_content: updated,
            branch_name: BULK_BRANCH_NAME.to_string(),
            title: bulk_title(pending.len()),
            body: bulk_body(&pending),
            base_branch: config.base_branch.clone(),
        };
        let url = publisher
            .create_pull_request(&spec)
            .await
            .context("failed to create joint PR")?;
        prs_created += 1;
        info!("created joint PR: {url}");
    }

    info!("done, created {prs_created} pull request(s)");
    Ok(prs_created)
}
