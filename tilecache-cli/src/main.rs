//! tilecache CLI - Command-line interface
//!
//! Inspects and produces entries in the tilecache stored-entry format and
//! shows the resolved cache settings.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::encode::EncodeArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilecache", about = "Tile cache entry tools", version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a stored entry and describe it
    Inspect {
        /// File holding the stored entry
        file: PathBuf,
    },

    /// Encode a file as a stored entry
    Encode(EncodeArgs),

    /// Show the resolved cache settings
    Config {
        /// Settings file (defaults to the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the settings as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Inspect { file } => commands::inspect::run(&file),
        Command::Encode(args) => commands::encode::run(&args),
        Command::Config { config, json } => commands::config::run(config.as_deref(), json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
