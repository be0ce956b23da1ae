//! Treatise CLI Binary
//!
//! Command-line interface for generating long-form documents.

use clap::Parser;
use std::io;
use std::process;
use tracing::{error, info};
use treatise::cli::{command_name, Cli, RunContext};
use treatise::config::ConfigLoader;
use treatise::logging::{init_logging, LoggingConfig};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(command = command_name(&cli.command), "Treatise CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", treatise::cli::map_error(&e));
            process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match context.execute(&cli.command, &mut out) {
        Ok(outcome) => {
            info!(?outcome, "Command finished");
            process::exit(outcome.exit_code());
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", treatise::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::new(&cli.workspace)
        .with_config_file(cli.config.clone())
        .build()
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }

    config
}
