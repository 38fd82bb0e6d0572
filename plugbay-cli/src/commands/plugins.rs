//! One-shot listing of the plugin directory

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use plugbay_core::HostConfig;
use plugbay_core::watcher::is_artifact;

/// Arguments for the plugins command
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Plugin directory (overrides config file and environment)
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = "plugbay.toml")]
    pub config: PathBuf,
}

/// Print the loadable artifacts currently in the plugin directory.
pub fn run(args: PluginsArgs) -> Result<()> {
    let mut config = HostConfig::from_sources(Some(&args.config))?;
    if let Some(dir) = args.plugins_dir {
        config.plugins_dir = dir;
    }

    if !config.plugins_dir.is_dir() {
        println!("plugin directory {} does not exist", config.plugins_dir.display());
        return Ok(());
    }

    let mut found = false;
    for entry in std::fs::read_dir(&config.plugins_dir)? {
        let path = entry?.path();
        if path.is_file() && is_artifact(&path) {
            let size = path.metadata().map(|m| m.len()).unwrap_or(0);
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                println!("{name}  ({size} bytes)");
                found = true;
            }
        }
    }
    if !found {
        println!("no plugin artifacts in {}", config.plugins_dir.display());
    }
    Ok(())
}
