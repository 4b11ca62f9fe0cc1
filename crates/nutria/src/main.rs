// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nutria - a WhatsApp nutrition assistant.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;
mod summary;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Nutria - a WhatsApp nutrition assistant.
#[derive(Parser, Debug)]
#[command(name = "nutria", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server, the reminder dispatcher and the agent loop.
    Serve,
    /// Print the meals a user recorded in a date range.
    Summary {
        /// The user's WhatsApp number.
        #[arg(long)]
        address: String,
        /// First day, inclusive (YYYY-MM-DD).
        #[arg(long)]
        from: NaiveDate,
        /// Last day, inclusive. Defaults to `--from`.
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Manage Nutria configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration and check what it points at.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `config check` reports configuration errors itself.
    if let Some(Commands::Config {
        action: ConfigCommands::Check { plain },
    }) = cli.command
    {
        let failures = check::run_check(plain).await;
        std::process::exit(if failures > 0 { 1 } else { 0 });
    }

    let config = match nutria_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            nutria_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Summary { address, from, to }) => {
            summary::run_summary(&config, &address, from, to.unwrap_or(from)).await
        }
        Some(Commands::Config { .. }) => Ok(()),
        None => {
            println!("nutria: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
