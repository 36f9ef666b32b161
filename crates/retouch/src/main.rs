//! Retouch CLI - batch image editing from the command line.
//!
//! Retouch applies one edit recipe to many images at once and writes one
//! output file per successful input.
//!
//! # Usage
//!
//! ```bash
//! # Brighten every image in a directory and save as WebP
//! retouch process ./photos/ --brightness 1.2 --format webp
//!
//! # Apply a recipe file and write a JSON report
//! retouch process a.jpg b.png --recipe edit.toml --report report.json
//!
//! # View configuration
//! retouch config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Retouch - batch image editing from the command line.
#[derive(Parser, Debug)]
#[command(name = "retouch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply an edit recipe to a batch of images
    Process(Box<cli::process::ProcessArgs>),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match retouch_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `retouch config path`."
            );
            retouch_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Retouch v{}", retouch_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(*args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
