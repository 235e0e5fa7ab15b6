//! pki-ops - operator tooling around the openssl command line
//!
//! This tool provides functionality for:
//! - Benchmarking openssl ciphers and key derivation functions
//! - Rotating service certificates with backup and rollback
//! - Generating and publishing certificate revocation lists

use clap::Parser;
use console::style;
use pki_ops::cli::{Cli, Commands};
use pki_ops::config::load_config;
use pki_ops::output::print_error;
use pki_ops::process::SystemRunner;
use pki_ops::{commands, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle color preference
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        let code = e.exit_code();
        if code == 2 {
            eprintln!("{}", style("Run 'pki-ops --help' for usage.").dim());
        }
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_config(cli.config.as_deref())?;
    let log_file = cli.log_file.clone().or_else(|| settings.logging.file.clone());
    init_logging(cli.verbose, !cli.no_color, log_file.as_deref())?;

    let runner = SystemRunner;
    match &cli.command {
        Commands::Benchmark(args) => commands::run_benchmark(args, &settings, &runner),
        Commands::Rotate(args) => commands::run_rotate(args, &settings, &runner).await,
        Commands::Crl(args) => commands::run_crl(args, &settings, &runner),
    }
}

/// Log to stderr, and also append to `log_file` when one is configured
fn init_logging(verbose: bool, ansi: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(ansi)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();
    Ok(())
}
