use clap::Parser;
use tracing_subscriber::EnvFilter;

use plugin_gitops_updater::config::UpdaterConfig;
use plugin_gitops_updater::updater;

#[derive(Parser)]
#[command(name = "plugin-gitops-updater")]
#[command(version, about = "Automates version bumps for OCI plugin references in a GitOps-managed YAML configuration")]
struct Cli {
    /// Path to the plugins config file (overrides DYNAMIC_PLUGINS_CONFIG_YAML_FILE_PATH)
    #[arg(long)]
    config_file: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = UpdaterConfig::from_env();
    if let Some(path) = cli.config_file {
        config.config_path = path;
    }

    let default_level = if cli.verbose || config.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(updater::run(&config))?;

    Ok(())
}
