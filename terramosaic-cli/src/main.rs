//! TerraMosaic CLI - Command-line interface
//!
//! This binary provides a command-line interface to the TerraMosaic
//! library: assembling territory mosaics, managing configuration and
//! cleaning the scratch directory.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{assemble, clean, config};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "terramosaic", version, about = "Cloud-free satellite mosaic assembly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Assemble and publish a mosaic for one territory
    Assemble(assemble::AssembleArgs),

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Wipe the scratch directory
    Clean,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Assemble(args) => assemble::run(args),
        Commands::Config { command } => config::run(command),
        Commands::Clean => clean::run(),
    }
}
