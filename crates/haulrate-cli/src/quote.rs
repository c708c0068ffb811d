//! # Quote Subcommand
//!
//! Prices a load from the command line and prints the same report the API
//! returns from `/v1/loads/:id/negotiate`, minus the load and audit fields.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use haulrate_core::{
    negotiate, FuelMode, MileageEstimate, NegotiationConfig, NegotiationInput, NegotiationReport,
};
use haulrate_providers::FuelCostResolver;

/// Arguments for the `haulrate quote` subcommand.
#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    /// Miles driven with freight aboard.
    #[arg(long)]
    pub loaded_miles: f64,

    /// Loaded plus deadhead miles. Defaults to loaded miles plus the
    /// configured deadhead buffer.
    #[arg(long)]
    pub total_miles: Option<f64>,

    #[arg(long, default_value_t = 0.0)]
    pub lumper_fee: f64,

    #[arg(long, default_value_t = 0.0)]
    pub detention_hours: f64,

    #[arg(long, default_value_t = 0.0)]
    pub breakdown_fee: f64,

    /// Layover days; fractional days are truncated.
    #[arg(long, default_value_t = 0.0)]
    pub layover_days: f64,

    #[arg(long, default_value_t = 0.0)]
    pub layover_per_day: f64,

    /// `national` or `origin_state`.
    #[arg(long, default_value = "national")]
    pub fuel_mode: String,

    /// Two-letter origin state for state diesel pricing.
    #[arg(long)]
    pub origin_state: Option<String>,

    /// Requested driver pay per loaded mile. Policy default when omitted.
    #[arg(long = "cpm")]
    pub driver_loaded_mile_pay: Option<f64>,

    /// Reason for a CPM above the policy threshold.
    #[arg(long)]
    pub override_reason: Option<String>,

    /// Diesel price in dollars per gallon. Skips the live feed.
    #[arg(long)]
    pub diesel_price: Option<f64>,

    /// YAML policy file overriding the defaults.
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

impl QuoteArgs {
    /// Calculator input, filling total miles from the deadhead buffer.
    pub fn to_input(&self, deadhead_buffer_pct: f64) -> NegotiationInput {
        let (loaded_miles, total_miles) = match self.total_miles {
            Some(total) => (self.loaded_miles, total),
            None => {
                let estimate = MileageEstimate::from_routed_miles(self.loaded_miles, deadhead_buffer_pct);
                (estimate.loaded_miles, estimate.total_miles)
            }
        };
        NegotiationInput {
            loaded_miles,
            total_miles,
            lumper_fee: self.lumper_fee,
            detention_hours: self.detention_hours,
            breakdown_fee: self.breakdown_fee,
            layover_days: self.layover_days,
            layover_per_day: self.layover_per_day,
            fuel_mode: FuelMode::parse_lenient(&self.fuel_mode),
            origin_state: self.origin_state.clone(),
            driver_loaded_mile_pay: self.driver_loaded_mile_pay,
            override_reason: self.override_reason.clone(),
            apply_to_load: false,
        }
    }
}

/// Price a quote against an explicit configuration and fuel resolver.
pub async fn build_quote(
    args: &QuoteArgs,
    config: &NegotiationConfig,
    fuel: &FuelCostResolver,
) -> Result<NegotiationReport> {
    let input = args.to_input(config.deadhead_buffer_pct);
    input.validate()?;

    let quote = fuel
        .get_fuel_quote(input.origin_state.as_deref(), input.fuel_mode)
        .await;
    if let Some(diagnostic) = &quote.diagnostic {
        tracing::warn!(%diagnostic, "fuel price unavailable, pricing without fuel");
    }

    let negotiation = negotiate(&input, &config.policy, &quote)?;
    Ok(NegotiationReport::build(&input, &config.policy, &quote, &negotiation))
}

/// Execute the quote subcommand.
pub async fn run_quote(args: &QuoteArgs) -> Result<u8> {
    let config = crate::negotiation_config(args.policy.as_deref())?;
    let fuel = crate::fuel_resolver(args.diesel_price, config.mpg)?;
    let report = build_quote(args, &config, &fuel).await?;
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    crate::print_json(&report)?;
    Ok(0)
}
