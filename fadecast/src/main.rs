mod server;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use fadecast_core::{bootstrap::load_config, logging};

#[derive(Debug, Parser)]
#[command(name = "fadecast", version, about = "Crossfade broadcast sync server and viewer")]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true, env = "FADECAST_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the sync server (default)
    Serve,
    /// Follow a channel from the terminal with headless players
    Watch {
        /// Channel hash or 4-digit broadcast code
        #[arg(long)]
        channel: String,
        /// Server base URL, overrides viewer.server_url
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("fadecast server starting...");
            info!("HTTP address: {}", config.http_address());
            server::FadecastServer::new(config).start().await
        }
        Command::Watch { channel, server } => watch::run(&config, &channel, server).await,
    }
}
