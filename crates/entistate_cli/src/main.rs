//! EntiState CLI
//!
//! Command-line tools for exercising EntiState collections.
//!
//! # Commands
//!
//! - `run` - Replay an operation script and report notifications
//! - `check` - Validate an operation script without running it

mod commands;
mod script;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EntiState command-line tools.
#[derive(Parser)]
#[command(name = "entistate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an operation script against a record collection
    Run {
        /// Path to the JSON script
        script: PathBuf,

        /// Field holding record ids
        #[arg(long, default_value = "id")]
        id_key: String,

        /// Allow several active ids
        #[arg(short, long)]
        multi: bool,

        /// Undo steps kept per entity
        #[arg(long, default_value = "10")]
        max_age: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate an operation script
    Check {
        /// Path to the JSON script
        script: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            script,
            id_key,
            multi,
            max_age,
            format,
        } => {
            let options = commands::run::RunOptions {
                id_key,
                multi,
                max_age,
            };
            commands::run::run(&script, &options, &format)?;
        }
        Commands::Check { script } => {
            commands::check::run(&script)?;
        }
        Commands::Version => {
            println!("EntiState CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EntiState Core v{}", entistate_core::VERSION);
        }
    }

    Ok(())
}
