//! Response payload assembled around a negotiation.
//!
//! Everything here is rounded for presentation. The same sections are stored
//! as opaque JSON in the audit log, so field names are part of the wire
//! contract.

use serde::{Deserialize, Serialize};

use crate::fuel::{FuelMode, FuelQuote, FuelSource};
use crate::money::round_to;
use crate::negotiation::{Negotiation, NegotiationInput, RateBreakdown};
use crate::policy::PolicyDefaults;

/// Market figures the calculation assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    pub carrier_cost_per_total_mile: f64,
    pub carrier_margin_pct: f64,
    pub broker_margin_pct: f64,
    pub dispatch_pct: f64,
    pub detention_per_hour: f64,
    pub driver_reason_threshold: f64,
    pub fuel_source: FuelSource,
    pub diesel_price: Option<f64>,
    pub fuel_period: Option<String>,
    pub fuel_series_id: String,
    pub mpg: f64,
}

/// Echo of the numeric inputs as priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsEcho {
    pub loaded_miles: f64,
    pub total_miles: f64,
    pub lumper_fee: f64,
    pub detention_hours: f64,
    pub breakdown_fee: f64,
    pub layover_days: f64,
    pub layover_per_day: f64,
    pub fuel_mode: FuelMode,
    pub origin_state: Option<String>,
}

/// Headline terms of the negotiated rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTerms {
    pub driver_loaded_mile_pay: f64,
    pub override_reason: Option<String>,
    pub fuel_mode: FuelMode,
    pub origin_state: Option<String>,
    pub fuel_per_mile: f64,
    pub broker_rate: f64,
    pub all_in: f64,
    pub linehaul: f64,
    pub driver_pay: f64,
    pub fuel_surcharge: f64,
    pub fuel_total: f64,
    pub carrier_total: f64,
    pub carrier_cost_est: f64,
    pub dispatcher_cut: f64,
    pub broker_profit: f64,
    pub broker_margin: f64,
}

/// The full negotiation response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationReport {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub policy_defaults: PolicyDefaults,
    /// Reserved for per-policy caps; currently always empty.
    pub policy_caps: serde_json::Map<String, serde_json::Value>,
    pub market_assumptions: MarketAssumptions,
    pub inputs: InputsEcho,
    pub selected: SelectedTerms,
    pub fuel: serde_json::Value,
    pub breakdown: RateBreakdown,
    pub apply_to_load: bool,
}

impl NegotiationReport {
    /// Build the report for a completed negotiation.
    pub fn build(
        input: &NegotiationInput,
        policy: &PolicyDefaults,
        fuel: &FuelQuote,
        negotiation: &Negotiation,
    ) -> Self {
        let breakdown = negotiation.breakdown.rounded();
        let origin_state = input.normalized_origin_state();

        let market_assumptions = MarketAssumptions {
            carrier_cost_per_total_mile: policy.carrier_cost_per_total_mile,
            carrier_margin_pct: policy.carrier_margin_pct,
            broker_margin_pct: policy.broker_margin_pct,
            dispatch_pct: policy.dispatch_pct,
            detention_per_hour: policy.detention_per_hour,
            driver_reason_threshold: policy.driver_reason_threshold,
            fuel_source: fuel.source,
            diesel_price: fuel.diesel_price,
            fuel_period: fuel.period.clone(),
            fuel_series_id: fuel.series_id.clone(),
            mpg: fuel.mpg_used,
        };

        let inputs = InputsEcho {
            loaded_miles: input.loaded_miles,
            total_miles: input.total_miles,
            lumper_fee: input.lumper_fee,
            detention_hours: input.detention_hours,
            breakdown_fee: input.breakdown_fee,
            layover_days: input.layover_days.trunc(),
            layover_per_day: input.layover_per_day,
            fuel_mode: input.fuel_mode,
            origin_state: origin_state.clone(),
        };

        let selected = SelectedTerms {
            driver_loaded_mile_pay: negotiation.requested_cpm,
            override_reason: negotiation.override_reason.clone(),
            fuel_mode: input.fuel_mode,
            origin_state,
            fuel_per_mile: round_to(fuel.per_mile_cost, 5),
            broker_rate: breakdown.customer_rate_total,
            all_in: breakdown.customer_rate_total,
            linehaul: breakdown.linehaul_display,
            driver_pay: breakdown.driver_total,
            fuel_surcharge: breakdown.fuel_total,
            fuel_total: breakdown.fuel_total,
            carrier_total: breakdown.carrier_revenue,
            carrier_cost_est: breakdown.carrier_cost_subtotal,
            dispatcher_cut: breakdown.dispatch_fee,
            broker_profit: breakdown.broker_profit,
            broker_margin: breakdown.broker_margin_pct_real,
        };

        Self {
            ok: true,
            warnings: negotiation.warnings.clone(),
            policy_defaults: *policy,
            policy_caps: serde_json::Map::new(),
            market_assumptions,
            inputs,
            selected,
            fuel: fuel.report(input.loaded_miles),
            breakdown,
            apply_to_load: negotiation.apply_to_load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::SeriesSelection;
    use crate::negotiation::negotiate;

    fn build(input: &NegotiationInput, fuel: &FuelQuote) -> NegotiationReport {
        let policy = PolicyDefaults::default();
        let n = negotiate(input, &policy, fuel).unwrap();
        NegotiationReport::build(input, &policy, fuel, &n)
    }

    #[test]
    fn selected_terms_mirror_rounded_breakdown() {
        let fuel = FuelQuote::priced(
            SeriesSelection::state("EMD_EPD2D_PTE_STX_DPG", "TX".into()),
            3.80,
            Some("2026-10-12".into()),
            6.5,
        );
        let input = NegotiationInput {
            loaded_miles: 500.0,
            total_miles: 540.0,
            fuel_mode: FuelMode::OriginState,
            origin_state: Some("tx".into()),
            ..NegotiationInput::default()
        };
        let r = build(&input, &fuel);
        assert!(r.ok);
        assert_eq!(r.selected.broker_rate, r.breakdown.customer_rate_total);
        assert_eq!(r.selected.all_in, r.breakdown.customer_rate_total);
        assert_eq!(r.selected.driver_pay, r.breakdown.driver_total);
        assert_eq!(r.selected.fuel_surcharge, r.breakdown.fuel_total);
        assert_eq!(r.selected.dispatcher_cut, r.breakdown.dispatch_fee);
        assert_eq!(r.selected.origin_state.as_deref(), Some("TX"));
        assert_eq!(r.market_assumptions.fuel_source, FuelSource::State);
        assert_eq!(r.market_assumptions.fuel_series_id, "EMD_EPD2D_PTE_STX_DPG");
        assert_eq!(r.fuel["ok"], true);
    }

    #[test]
    fn report_serializes_expected_sections() {
        let fuel = FuelQuote::unavailable(
            SeriesSelection::national(FuelMode::National, None, false),
            6.5,
            "Missing EIA_API_KEY",
        );
        let input = NegotiationInput {
            loaded_miles: 239.0,
            total_miles: 260.0,
            ..NegotiationInput::default()
        };
        let v = serde_json::to_value(build(&input, &fuel)).unwrap();
        for key in [
            "ok",
            "warnings",
            "policy_defaults",
            "policy_caps",
            "market_assumptions",
            "inputs",
            "selected",
            "fuel",
            "breakdown",
            "apply_to_load",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["breakdown"]["driver_linehaul_pay"], 1015.75);
        assert_eq!(v["fuel"]["ok"], false);
        assert_eq!(v["fuel"]["source"], "UNAVAILABLE");
        assert_eq!(v["market_assumptions"]["diesel_price"], serde_json::Value::Null);
        assert_eq!(v["policy_caps"], serde_json::json!({}));
    }

    #[test]
    fn identical_inputs_produce_identical_reports() {
        let fuel = FuelQuote::priced(
            SeriesSelection::national(FuelMode::National, None, false),
            4.0,
            None,
            6.5,
        );
        let input = NegotiationInput {
            loaded_miles: 812.4,
            total_miles: 870.0,
            detention_hours: 1.5,
            ..NegotiationInput::default()
        };
        let a = serde_json::to_vec(&build(&input, &fuel)).unwrap();
        let b = serde_json::to_vec(&build(&input, &fuel)).unwrap();
        assert_eq!(a, b);
    }
}
