//! Web host: endpoint plugins served over HTTP with hot-swap

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use plugbay_core::{HostConfig, HostMode, LifecycleManager};
use plugbay_server::{PluginServer, ServerConfig};
use tracing::info;

/// Default port for the plugbay web host
pub const DEFAULT_PORT: u16 = 7931;
/// Default bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Plugin directory (overrides config file and environment)
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = "plugbay.toml")]
    pub config: PathBuf,

    /// Grace period in seconds before a swapped-out plugin is disposed
    #[arg(long)]
    pub grace_period: Option<u64>,

    /// Replace plugins with a full unload/load instead of hot-swap
    #[arg(long)]
    pub no_hot_swap: bool,
}

/// Run the web host until ctrl-c.
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = HostConfig::from_sources(Some(&args.config))?;
    if let Some(dir) = args.plugins_dir {
        config.plugins_dir = dir;
    }
    if let Some(secs) = args.grace_period {
        config.grace_period = std::time::Duration::from_secs(secs);
    }
    if args.no_hot_swap {
        config.enable_hot_swap = false;
    }

    let manager = LifecycleManager::new(config.clone(), HostMode::Web);
    manager.start().await?;

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        allowed_origins: config.allowed_origins,
    };
    info!("starting plugbay server on {}", server_config.addr());

    let server = PluginServer::new(server_config, Arc::clone(&manager));
    server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    manager.dispose().await;
    Ok(())
}
