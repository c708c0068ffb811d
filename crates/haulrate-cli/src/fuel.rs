//! # Fuel Subcommand
//!
//! Resolves the diesel price a negotiation would use and prints the fuel
//! section of the report, including provenance.

use anyhow::Result;
use clap::Args;
use haulrate_core::FuelMode;

/// Arguments for the `haulrate fuel` subcommand.
#[derive(Args, Debug, Clone)]
pub struct FuelArgs {
    /// `national` or `origin_state`.
    #[arg(long, default_value = "national")]
    pub mode: String,

    /// Two-letter origin state, used with `origin_state` mode.
    #[arg(long)]
    pub origin_state: Option<String>,

    /// Loaded miles for the fuel total.
    #[arg(long, default_value_t = 0.0)]
    pub loaded_miles: f64,

    /// Diesel price in dollars per gallon. Skips the live feed.
    #[arg(long)]
    pub diesel_price: Option<f64>,
}

/// Execute the fuel subcommand.
///
/// Returns exit code 0 when a price was found, 1 when the quote is
/// unavailable (the report is still printed).
pub async fn run_fuel(args: &FuelArgs) -> Result<u8> {
    let config = crate::negotiation_config(None)?;
    let fuel = crate::fuel_resolver(args.diesel_price, config.mpg)?;
    let quote = fuel
        .get_fuel_quote(args.origin_state.as_deref(), FuelMode::parse_lenient(&args.mode))
        .await;
    crate::print_json(&quote.report(args.loaded_miles))?;
    Ok(if quote.is_available() { 0 } else { 1 })
}
