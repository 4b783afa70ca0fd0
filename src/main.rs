//! Hotwire - A hot-reload supervisor for long-running workers.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod freshness;
mod lifecycle;
mod logger;
mod resolve;
mod runner;
mod supervisor;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SupervisorConfig;

fn main() {
    if let Err(err) = try_main() {
        log!("error"; "{:#}", err);
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SupervisorConfig::load(cli.config_args())?;
    config.logging.apply(cli.verbose);
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    match &cli.command {
        Commands::Run {
            identifiers,
            reload,
            ..
        } => cli::run::run_workers(&config, identifiers, *reload),
        Commands::ShowConfig { .. } => cli::show::show_config(&config),
        Commands::List { identifiers, .. } => cli::list::list_workers(&config, identifiers),
    }
}
