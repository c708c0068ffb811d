//! # haulrate CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use haulrate_cli::fuel::{run_fuel, FuelArgs};
use haulrate_cli::geocode::{run_geocode, GeocodeArgs};
use haulrate_cli::miles::{run_miles, MilesArgs};
use haulrate_cli::quote::{run_quote, QuoteArgs};

/// haulrate: freight rate negotiation from the command line.
///
/// Prices loads with the same policy, fuel, and mileage logic as the API
/// service. JSON goes to stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "haulrate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Price a load and print the negotiation report.
    Quote(QuoteArgs),

    /// Resolve a diesel price and fuel cost per mile.
    Fuel(FuelArgs),

    /// Geocode a postal code through the provider chain.
    Geocode(GeocodeArgs),

    /// Routed mileage between two postal codes.
    Miles(MilesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Quote(args) => run_quote(args).await,
            Commands::Fuel(args) => run_fuel(args).await,
            Commands::Geocode(args) => run_geocode(args).await,
            Commands::Miles(args) => run_miles(args).await,
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
