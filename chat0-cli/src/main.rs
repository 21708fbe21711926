use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "chat0", about = "Multi-provider LLM chat gateway and client")]
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
    /// Send a message and stream the reply
    Chat(commands::chat::ChatArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// List the model catalog
    Models,
    /// Run the chat0 gateway
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load()?;

    match cli.command {
        Commands::Chat(args) => commands::chat::run(args, config).await,
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Models => commands::models::run(&config),
        Commands::Serve(args) => commands::serve::run(args, config).await,
    }
}
