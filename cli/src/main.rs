//! NexusClip CLI - LAN clipboard sync daemon.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use nexusclip_core::protocol::constants::SYNC_PORT;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nexusclip")]
#[command(about = "Clipboard sync over local UDP broadcast", long_about = None)]
struct Cli {
    /// UDP port shared by unicast and broadcast traffic
    #[arg(short, long, default_value_t = SYNC_PORT)]
    port: u16,

    /// Device name to advertise
    #[arg(short, long, default_value_t = default_device_name())]
    name: String,

    /// Log protocol details and per-frame errors
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn default_device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "nexusclip-device".to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Start the sync daemon (default)
    Run,
    /// Show device info
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let core_level = if cli.verbose {
        "nexusclip_core=debug"
    } else {
        "nexusclip_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(core_level.parse()?)
                .add_directive("mdns_sd=warn".parse()?),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run_service(cli.name, cli.port).await?,
        Commands::Info => commands::show_info(cli.name, cli.port),
    }

    Ok(())
}
