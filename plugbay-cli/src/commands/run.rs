//! Console host: lifecycle plugins, interactive shutdown via stdin

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use plugbay_core::{HostConfig, HostMode, LifecycleManager};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Plugin directory (overrides config file and environment)
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = "plugbay.toml")]
    pub config: PathBuf,
}

/// Run the console host until `q` on stdin or ctrl-c.
pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = HostConfig::from_sources(Some(&args.config))?;
    if let Some(dir) = args.plugins_dir {
        config.plugins_dir = dir;
    }

    let manager = LifecycleManager::new(config, HostMode::Console);
    manager.start().await?;
    info!("console host running, enter 'q' to quit");

    wait_for_quit().await?;

    manager.dispose().await;
    Ok(())
}

fn is_quit_line(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

async fn wait_for_quit() -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line? {
                    Some(line) if is_quit_line(&line) => break,
                    Some(_) => {}
                    // stdin closed
                    None => break,
                }
            }
        }
    }
    Ok(())
}
