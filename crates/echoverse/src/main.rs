// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Echoverse - real-time AI chat relay.
//!
//! This is the binary entry point for the Echoverse server.

mod serve;
mod shutdown;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use echoverse_config::EchoverseConfig;

/// Echoverse - real-time AI chat relay.
#[derive(Parser, Debug)]
#[command(name = "echoverse", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP and WebSocket server (the default).
    Serve {
        /// Read configuration from this file instead of the standard locations.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Validate configuration and print the effective settings.
    CheckConfig {
        /// Read configuration from this file instead of the standard locations.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => {
            let config = load_config_or_exit(config.as_deref());
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("echoverse: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig { config } => {
            let config = load_config_or_exit(config.as_deref());
            match echoverse_config::render_effective(&config) {
                Ok(rendered) => print!("{rendered}"),
                Err(e) => {
                    echoverse_config::render_errors(&[e]);
                    std::process::exit(1);
                }
            }
            if config.openai.resolve_api_key().is_none() {
                eprintln!("echoverse: warning: no OpenAI API key configured; `serve` will refuse to start");
            }
        }
    }
}

/// Loads and validates configuration, printing diagnostics and exiting on error.
fn load_config_or_exit(path: Option<&Path>) -> EchoverseConfig {
    let loaded = match path {
        Some(path) => echoverse_config::load_and_validate_path(path),
        None => echoverse_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            echoverse_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}
