use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plugbay", about = "Hot-swapping plugin host")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the console host (lifecycle plugins)
    Run(commands::run::RunArgs),
    /// Run the web host (endpoint plugins)
    Serve(commands::serve::ServeArgs),
    /// List artifacts in the plugin directory
    Plugins(commands::plugins::PluginsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Plugins(args) => commands::plugins::run(args),
    }
}
