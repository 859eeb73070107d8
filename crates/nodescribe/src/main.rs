// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! nodescribe - single-writer gateway for node state annotations.
//!
//! This is the binary entry point: configuration inspection and a load
//! simulation of the writer against an in-memory store.

mod shutdown;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nodescribe_config::{ConfigError, NodescribeConfig};
use nodescribe_writer::{WriterSettings, recording};

use crate::simulate::SimulateArgs;

/// nodescribe - single-writer gateway for node state annotations.
#[derive(Parser, Debug)]
#[command(name = "nodescribe", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the writer with concurrent producers against an in-memory store.
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> Result<NodescribeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => nodescribe_config::load_and_validate_path(path),
        None => nodescribe_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            nodescribe_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);
    recording::register_metrics();

    match cli.command {
        Commands::Simulate(args) => {
            let cancel = shutdown::install_signal_handler();
            let settings = WriterSettings::from(&config);
            let report = simulate::run_simulation(&args, &settings, cancel).await;
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("nodescribe: failed to encode report: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("nodescribe: failed to render config: {e}");
                std::process::exit(1);
            }
        },
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "nodescribe={log_level},nodescribe_writer={log_level},nodescribe_core={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
