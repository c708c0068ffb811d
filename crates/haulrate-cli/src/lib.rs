//! # haulrate-cli: Command-Line Front End
//!
//! Provides the `haulrate` binary for pricing loads and poking at the
//! external feeds without running the API.
//!
//! ## Subcommands
//!
//! - `haulrate quote`: price a load and print the negotiation report.
//! - `haulrate fuel`: resolve a diesel price and fuel cost per mile.
//! - `haulrate geocode`: geocode a postal code through the provider chain.
//! - `haulrate miles`: routed mileage between two postal codes.
//!
//! ```bash
//! haulrate quote --loaded-miles 239 --total-miles 260 --diesel-price 4.00
//! haulrate fuel --mode origin_state --origin-state CA
//! haulrate miles 75201 77002
//! ```
//!
//! Configuration comes from the same environment variables as the API
//! (`HAULRATE_POLICY_FILE`, `DEFAULT_MPG`, `DEADHEAD_BUFFER_PCT`,
//! `EIA_API_KEY`, `ORS_API_KEY`, ...). `--diesel-price` skips the live
//! diesel feed entirely.

pub mod fuel;
pub mod geocode;
pub mod miles;
pub mod quote;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use haulrate_core::{NegotiationConfig, PolicyDefaults};
use haulrate_providers::config::state_series_from_env;
use haulrate_providers::{
    resolvers_from_config, FixedPriceFeed, FuelCostResolver, ProviderConfig, RouteDistanceResolver,
};
use serde::Serialize;

/// Negotiation configuration from the environment, with an optional policy
/// file taking precedence over `HAULRATE_POLICY_FILE`.
pub fn negotiation_config(policy_file: Option<&Path>) -> Result<NegotiationConfig> {
    let config = NegotiationConfig::from_env().context("failed to load negotiation configuration")?;
    match policy_file {
        Some(path) => {
            let policy = PolicyDefaults::from_yaml_file(path)?;
            tracing::info!(path = %path.display(), "using policy file");
            Ok(config.with_policy(policy)?)
        }
        None => Ok(config),
    }
}

/// Live resolvers over the environment's provider configuration.
pub fn live_resolvers(mpg: f64) -> Result<(FuelCostResolver, RouteDistanceResolver)> {
    let providers = ProviderConfig::from_env().context("failed to load provider configuration")?;
    tracing::debug!(?providers, "provider configuration");
    Ok(resolvers_from_config(&providers, mpg)?)
}

/// Fuel resolver for a command: a fixed price when one was given,
/// otherwise the live diesel feed. Both select series from
/// `HAULRATE_FUEL_STATE_SERIES`.
pub fn fuel_resolver(diesel_price: Option<f64>, mpg: f64) -> Result<FuelCostResolver> {
    match diesel_price {
        Some(price) => Ok(FuelCostResolver::new(
            Arc::new(FixedPriceFeed::new(price, None)),
            state_series_from_env().context("failed to load provider configuration")?,
            mpg,
        )),
        None => live_resolvers(mpg).map(|(fuel, _)| fuel),
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use haulrate_core::FuelMode;

    #[tokio::test]
    async fn fixed_price_resolver_honors_state_series_env() {
        std::env::set_var("HAULRATE_FUEL_STATE_SERIES", "WY=SERIES_WY");
        let resolver = fuel_resolver(Some(4.0), 6.5);
        std::env::remove_var("HAULRATE_FUEL_STATE_SERIES");

        let quote = resolver
            .unwrap()
            .get_fuel_quote(Some("WY"), FuelMode::OriginState)
            .await;
        assert_eq!(quote.series_id, "SERIES_WY");
        assert!(!quote.series_fallback);
        assert_eq!(quote.diesel_price, Some(4.0));
    }
}
