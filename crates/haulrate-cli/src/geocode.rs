//! # Geocode Subcommand
//!
//! Runs a postal code through the live geocoder chain and prints the
//! resolution: coordinates with provenance, or the failure with every
//! provider attempt.

use anyhow::Result;
use clap::Args;

/// Arguments for the `haulrate geocode` subcommand.
#[derive(Args, Debug, Clone)]
pub struct GeocodeArgs {
    /// Postal code, e.g. `75201` or `75201-4412`.
    #[arg(value_name = "POSTAL_CODE")]
    pub postal: String,

    /// Two-letter country code.
    #[arg(long, default_value = "US")]
    pub country: String,
}

/// Execute the geocode subcommand. Exit code 1 when unresolved.
pub async fn run_geocode(args: &GeocodeArgs) -> Result<u8> {
    let config = crate::negotiation_config(None)?;
    let (_, routes) = crate::live_resolvers(config.mpg)?;
    let resolution = routes
        .geocoder()
        .geocode_raw(&args.postal, &args.country)
        .await;
    crate::print_json(&resolution)?;
    Ok(if resolution.is_resolved() { 0 } else { 1 })
}
