//! ticketwatch-mcp: MCP server over stdio for managing the watcher config.

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use ticketwatch_mcp::{ConfigStore, ConfigTools, McpServer, StdioTransport};

/// Serve config-management tools to an MCP client on stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "ticketwatch-mcp", version, about)]
struct Cli {
    /// Path to the YAML config file to manage.
    #[arg(long, env = "TICKETWATCH_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is the protocol channel
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = ConfigStore::new(&cli.config);
    if !store.exists() {
        warn!(path = %cli.config.display(), "config file not found; tools will report it");
    }

    let mut server = McpServer::new(ConfigTools::new(store));
    let mut transport = StdioTransport::new();
    server.run(&mut transport).await?;
    Ok(())
}
