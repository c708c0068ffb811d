//! # Miles Subcommand
//!
//! Routed mileage between two postal codes, with the configured deadhead
//! buffer applied the same way the API's route-miles endpoint does.

use anyhow::Result;
use clap::Args;
use haulrate_core::MileageEstimate;
use haulrate_providers::{Resolution, RouteDistance};
use serde_json::json;

/// Arguments for the `haulrate miles` subcommand.
#[derive(Args, Debug, Clone)]
pub struct MilesArgs {
    /// Origin postal code.
    #[arg(value_name = "ORIGIN")]
    pub origin: String,

    /// Destination postal code.
    #[arg(value_name = "DEST")]
    pub dest: String,

    /// Two-letter country code.
    #[arg(long, default_value = "US")]
    pub country: String,
}

/// Shape a route resolution for output.
pub fn render(resolution: Resolution<RouteDistance>, deadhead_buffer_pct: f64) -> (serde_json::Value, bool) {
    match resolution.into_result() {
        Ok((route, meta)) => {
            let estimate = MileageEstimate::from_routed_miles(route.miles, deadhead_buffer_pct);
            let out = json!({
                "ok": true,
                "country": route.country,
                "origin_postal": route.origin_postal,
                "dest_postal": route.dest_postal,
                "routed_miles": route.miles,
                "loaded_miles": estimate.loaded_miles,
                "total_miles": estimate.total_miles,
                "deadhead_buffer_pct": estimate.deadhead_buffer_pct,
                "routed_seconds": route.duration_seconds,
                "meta": meta,
            });
            (out, true)
        }
        Err(failure) => (json!({ "ok": false, "error": failure }), false),
    }
}

/// Execute the miles subcommand. Exit code 1 when unresolved.
pub async fn run_miles(args: &MilesArgs) -> Result<u8> {
    let config = crate::negotiation_config(None)?;
    let (_, routes) = crate::live_resolvers(config.mpg)?;
    let resolution = routes
        .route_distance_raw(&args.origin, &args.dest, &args.country)
        .await;
    let (out, resolved) = render(resolution, config.deadhead_buffer_pct);
    crate::print_json(&out)?;
    Ok(if resolved { 0 } else { 1 })
}
