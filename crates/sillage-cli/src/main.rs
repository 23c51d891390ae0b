//! Sillage CLI - real-time reverb host with a text control surface.

mod commands;
mod control;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sillage")]
#[command(author, version, about = "Sillage real-time reverb", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reverb on live input and control it from stdin
    Run(commands::run::RunArgs),

    /// List and inspect audio devices
    Devices(commands::devices::DevicesArgs),

    /// Generate an impulse response offline and print its statistics
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    }
}
