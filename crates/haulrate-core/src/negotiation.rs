//! # Rate Negotiation Calculator
//!
//! Turns mileage, accessorials and a fuel quote into the full multi-party
//! rate stack:
//!
//! ```text
//! driver pay ─┐
//! carrier operating cost (total miles) ─┤
//! lumper ─┤──► carrier cost subtotal ──► × (1 + carrier margin) = carrier revenue
//! fuel (loaded miles) ─┘                                   │
//!                                 + dispatch fee (× dispatch %) = broker cost
//!                                           × (1 + broker margin) = customer rate
//! ```
//!
//! [`negotiate`] is pure: no I/O, no clock, no environment. Identical inputs
//! always produce an identical [`Negotiation`]. Persisting an audit record or
//! writing results back to a load is the caller's explicit choice.
//!
//! ## Asymmetries
//!
//! - Carrier operating cost is charged on **total** miles (deadhead included);
//!   fuel is charged on **loaded** miles only.
//! - Detention always uses the policy hourly rate; layover always uses the
//!   caller's per-day rate.

use serde::{Deserialize, Serialize};

use crate::error::NegotiationError;
use crate::fuel::{normalize_state, FuelMode, FuelQuote};
use crate::money::{cents, round_to};
use crate::policy::PolicyDefaults;

/// Warning emitted when the requested CPM is above the reason threshold and
/// no override reason was supplied.
pub const CPM_THRESHOLD_WARNING: &str = "Driver CPM exceeds threshold";

/// Caller inputs for one negotiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationInput {
    /// Miles driven with freight aboard.
    pub loaded_miles: f64,
    /// Loaded plus deadhead miles.
    pub total_miles: f64,
    /// Lumper (unloading) fee paid by the carrier.
    pub lumper_fee: f64,
    /// Billable detention hours.
    pub detention_hours: f64,
    /// Breakdown fee passed straight through to the driver.
    pub breakdown_fee: f64,
    /// Layover days. Fractional days are truncated.
    pub layover_days: f64,
    /// Layover pay per day.
    pub layover_per_day: f64,
    /// How the diesel series is chosen.
    pub fuel_mode: FuelMode,
    /// Origin state for state-level diesel pricing.
    pub origin_state: Option<String>,
    /// Requested driver CPM; policy default when absent.
    pub driver_loaded_mile_pay: Option<f64>,
    /// Reason for a CPM above the policy threshold.
    pub override_reason: Option<String>,
    /// Whether the caller wants the result written to the load.
    pub apply_to_load: bool,
}

impl NegotiationInput {
    /// Reject inputs the calculator cannot price.
    pub fn validate(&self) -> Result<(), NegotiationError> {
        for (field, value) in [("loaded_miles", self.loaded_miles), ("total_miles", self.total_miles)] {
            if !value.is_finite() {
                return Err(NegotiationError::InvalidAmount { field });
            }
        }
        if self.loaded_miles <= 0.0 || self.total_miles <= 0.0 {
            return Err(NegotiationError::NonPositiveMiles);
        }
        if self.total_miles < self.loaded_miles {
            return Err(NegotiationError::TotalBelowLoaded);
        }

        let amounts = [
            ("lumper_fee", self.lumper_fee),
            ("detention_hours", self.detention_hours),
            ("breakdown_fee", self.breakdown_fee),
            ("layover_days", self.layover_days),
            ("layover_per_day", self.layover_per_day),
            (
                "driver_loaded_mile_pay",
                self.driver_loaded_mile_pay.unwrap_or(0.0),
            ),
        ];
        for (field, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(NegotiationError::InvalidAmount { field });
            }
        }
        Ok(())
    }

    /// Origin state, trimmed and uppercased.
    pub fn normalized_origin_state(&self) -> Option<String> {
        normalize_state(self.origin_state.as_deref())
    }

    /// Override reason, if one with content was given.
    pub fn effective_override_reason(&self) -> Option<&str> {
        self.override_reason
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Every step of the rate stack.
///
/// [`Negotiation::breakdown`] holds full precision; [`RateBreakdown::rounded`]
/// produces the cents view used at output boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBreakdown {
    pub driver_linehaul_pay: f64,
    pub driver_detention_pay: f64,
    pub driver_layover_pay: f64,
    pub driver_breakdown_pay: f64,
    pub driver_total: f64,
    pub carrier_operating_cost: f64,
    pub carrier_accessorials: f64,
    pub fuel_total: f64,
    pub carrier_cost_subtotal: f64,
    pub carrier_revenue: f64,
    pub dispatch_fee: f64,
    pub broker_cost: f64,
    pub customer_rate_total: f64,
    pub broker_profit: f64,
    pub broker_margin_pct_real: f64,
    pub linehaul_display: f64,
}

impl RateBreakdown {
    /// Money rounded to cents; the realized margin to four places.
    pub fn rounded(&self) -> Self {
        Self {
            driver_linehaul_pay: cents(self.driver_linehaul_pay),
            driver_detention_pay: cents(self.driver_detention_pay),
            driver_layover_pay: cents(self.driver_layover_pay),
            driver_breakdown_pay: cents(self.driver_breakdown_pay),
            driver_total: cents(self.driver_total),
            carrier_operating_cost: cents(self.carrier_operating_cost),
            carrier_accessorials: cents(self.carrier_accessorials),
            fuel_total: cents(self.fuel_total),
            carrier_cost_subtotal: cents(self.carrier_cost_subtotal),
            carrier_revenue: cents(self.carrier_revenue),
            dispatch_fee: cents(self.dispatch_fee),
            broker_cost: cents(self.broker_cost),
            customer_rate_total: cents(self.customer_rate_total),
            broker_profit: cents(self.broker_profit),
            broker_margin_pct_real: round_to(self.broker_margin_pct_real, 4),
            linehaul_display: cents(self.linehaul_display),
        }
    }
}

/// Values written back to a load when a negotiation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadRateUpdate {
    /// Driver total, in cents precision.
    pub driver_pay: f64,
    /// Fuel total, in cents precision.
    pub fuel_surcharge: f64,
}

/// Outcome of a negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    /// CPM actually used for driver linehaul pay.
    pub requested_cpm: f64,
    /// Override reason, if one with content was given.
    pub override_reason: Option<String>,
    /// Full-precision breakdown.
    pub breakdown: RateBreakdown,
    /// Informational warnings. Never block the calculation.
    pub warnings: Vec<String>,
    /// Echo of the caller's write-back request.
    pub apply_to_load: bool,
}

impl Negotiation {
    /// The load fields an applied negotiation sets.
    pub fn load_update(&self) -> LoadRateUpdate {
        LoadRateUpdate {
            driver_pay: cents(self.breakdown.driver_total),
            fuel_surcharge: cents(self.breakdown.fuel_total),
        }
    }
}

/// Price a load.
///
/// Fails only on invalid input; an unavailable fuel quote simply contributes
/// zero fuel cost.
pub fn negotiate(
    input: &NegotiationInput,
    policy: &PolicyDefaults,
    fuel: &FuelQuote,
) -> Result<Negotiation, NegotiationError> {
    input.validate()?;

    let requested_cpm = input
        .driver_loaded_mile_pay
        .unwrap_or(policy.driver_loaded_mile_pay);
    let override_reason = input.effective_override_reason().map(str::to_string);

    let mut warnings = Vec::new();
    if requested_cpm > policy.driver_reason_threshold && override_reason.is_none() {
        warnings.push(CPM_THRESHOLD_WARNING.to_string());
    }

    let driver_linehaul_pay = requested_cpm * input.loaded_miles;
    let driver_detention_pay = input.detention_hours * policy.detention_per_hour;
    let driver_layover_pay = input.layover_days.trunc() * input.layover_per_day;
    let driver_breakdown_pay = input.breakdown_fee;
    let driver_total =
        driver_linehaul_pay + driver_detention_pay + driver_layover_pay + driver_breakdown_pay;

    let carrier_operating_cost = policy.carrier_cost_per_total_mile * input.total_miles;
    let carrier_accessorials = input.lumper_fee;
    let fuel_total = fuel.fuel_total(input.loaded_miles);

    let carrier_cost_subtotal =
        driver_total + carrier_operating_cost + carrier_accessorials + fuel_total;
    let carrier_revenue = carrier_cost_subtotal * (1.0 + policy.carrier_margin_pct);
    let dispatch_fee = carrier_revenue * policy.dispatch_pct;
    let broker_cost = carrier_revenue + dispatch_fee;
    let customer_rate_total = broker_cost * (1.0 + policy.broker_margin_pct);

    let broker_profit = customer_rate_total - broker_cost;
    let broker_margin_pct_real = if customer_rate_total > 0.0 {
        broker_profit / customer_rate_total
    } else {
        0.0
    };
    let linehaul_display = (customer_rate_total - fuel_total).max(0.0);

    Ok(Negotiation {
        requested_cpm,
        override_reason,
        breakdown: RateBreakdown {
            driver_linehaul_pay,
            driver_detention_pay,
            driver_layover_pay,
            driver_breakdown_pay,
            driver_total,
            carrier_operating_cost,
            carrier_accessorials,
            fuel_total,
            carrier_cost_subtotal,
            carrier_revenue,
            dispatch_fee,
            broker_cost,
            customer_rate_total,
            broker_profit,
            broker_margin_pct_real,
            linehaul_display,
        },
        warnings,
        apply_to_load: input.apply_to_load,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::SeriesSelection;

    fn unavailable() -> FuelQuote {
        FuelQuote::unavailable(
            SeriesSelection::national(FuelMode::National, None, false),
            6.5,
            "Missing EIA_API_KEY",
        )
    }

    fn priced(price: f64) -> FuelQuote {
        FuelQuote::priced(
            SeriesSelection::national(FuelMode::National, None, false),
            price,
            Some("2026-10-12".into()),
            6.5,
        )
    }

    fn scenario_a() -> NegotiationInput {
        NegotiationInput {
            loaded_miles: 239.0,
            total_miles: 260.0,
            ..NegotiationInput::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rejects_non_positive_miles() {
        let policy = PolicyDefaults::default();
        let input = NegotiationInput {
            loaded_miles: 0.0,
            total_miles: 100.0,
            ..NegotiationInput::default()
        };
        assert_eq!(
            negotiate(&input, &policy, &unavailable()).unwrap_err(),
            NegotiationError::NonPositiveMiles
        );
        let input = NegotiationInput {
            loaded_miles: 10.0,
            total_miles: -1.0,
            ..NegotiationInput::default()
        };
        assert_eq!(
            negotiate(&input, &policy, &unavailable()).unwrap_err(),
            NegotiationError::NonPositiveMiles
        );
    }

    #[test]
    fn rejects_total_below_loaded() {
        let input = NegotiationInput {
            loaded_miles: 300.0,
            total_miles: 260.0,
            ..NegotiationInput::default()
        };
        assert_eq!(
            negotiate(&input, &PolicyDefaults::default(), &unavailable()).unwrap_err(),
            NegotiationError::TotalBelowLoaded
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        let policy = PolicyDefaults::default();
        let input = NegotiationInput {
            lumper_fee: -5.0,
            ..scenario_a()
        };
        assert_eq!(
            negotiate(&input, &policy, &unavailable()).unwrap_err(),
            NegotiationError::InvalidAmount { field: "lumper_fee" }
        );
        let input = NegotiationInput {
            loaded_miles: f64::NAN,
            ..scenario_a()
        };
        assert_eq!(
            negotiate(&input, &policy, &unavailable()).unwrap_err(),
            NegotiationError::InvalidAmount { field: "loaded_miles" }
        );
        let input = NegotiationInput {
            driver_loaded_mile_pay: Some(f64::INFINITY),
            ..scenario_a()
        };
        assert!(negotiate(&input, &policy, &unavailable()).is_err());
    }

    #[test]
    fn scenario_a_without_fuel() {
        let n = negotiate(&scenario_a(), &PolicyDefaults::default(), &unavailable()).unwrap();
        let b = n.breakdown.rounded();
        assert_eq!(b.driver_linehaul_pay, 1015.75);
        assert_eq!(b.fuel_total, 0.0);
        assert_eq!(b.carrier_operating_cost, 156.00);
        assert_eq!(b.driver_total, 1015.75);
        assert_eq!(b.carrier_cost_subtotal, 1171.75);
        assert_eq!(n.requested_cpm, 4.25);
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn scenario_a_full_stack() {
        let n = negotiate(&scenario_a(), &PolicyDefaults::default(), &unavailable()).unwrap();
        let b = n.breakdown;
        assert!(approx(b.carrier_revenue, 1171.75 * 1.06));
        assert!(approx(b.dispatch_fee, b.carrier_revenue * 0.08));
        assert!(approx(b.broker_cost, b.carrier_revenue + b.dispatch_fee));
        assert!(approx(b.customer_rate_total, b.broker_cost * 1.10));
        assert!(approx(b.broker_profit, b.customer_rate_total - b.broker_cost));
        assert_eq!(b.rounded().broker_margin_pct_real, 0.0909);
        assert!(approx(b.linehaul_display, b.customer_rate_total));
    }

    #[test]
    fn scenario_b_fuel_on_loaded_miles() {
        let n = negotiate(&scenario_a(), &PolicyDefaults::default(), &priced(4.00)).unwrap();
        let b = n.breakdown;
        assert!(approx(b.fuel_total, 4.00 / 6.5 * 239.0));
        assert_eq!(b.rounded().fuel_total, 147.08);
        assert!(approx(b.linehaul_display, b.customer_rate_total - b.fuel_total));
        // Subtotal carries full-precision fuel, not the rounded figure.
        assert!(approx(b.carrier_cost_subtotal, 1171.75 + 4.00 / 6.5 * 239.0));
    }

    #[test]
    fn scenario_c_threshold_warning() {
        let policy = PolicyDefaults::default();
        let input = NegotiationInput {
            driver_loaded_mile_pay: Some(6.00),
            ..scenario_a()
        };
        let n = negotiate(&input, &policy, &unavailable()).unwrap();
        assert_eq!(n.warnings, vec![CPM_THRESHOLD_WARNING.to_string()]);
        assert_eq!(n.requested_cpm, 6.00);

        let input = NegotiationInput {
            override_reason: Some("hazmat team".into()),
            ..input
        };
        let n = negotiate(&input, &policy, &unavailable()).unwrap();
        assert!(n.warnings.is_empty());
        assert_eq!(n.override_reason.as_deref(), Some("hazmat team"));
    }

    #[test]
    fn blank_override_reason_does_not_silence_warning() {
        let input = NegotiationInput {
            driver_loaded_mile_pay: Some(6.00),
            override_reason: Some("   ".into()),
            ..scenario_a()
        };
        let n = negotiate(&input, &PolicyDefaults::default(), &unavailable()).unwrap();
        assert_eq!(n.warnings.len(), 1);
        assert_eq!(n.override_reason, None);
    }

    #[test]
    fn cpm_at_threshold_does_not_warn() {
        let input = NegotiationInput {
            driver_loaded_mile_pay: Some(5.00),
            ..scenario_a()
        };
        let n = negotiate(&input, &PolicyDefaults::default(), &unavailable()).unwrap();
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn detention_uses_policy_rate_and_layover_uses_caller_rate() {
        let input = NegotiationInput {
            detention_hours: 3.0,
            layover_days: 2.7,
            layover_per_day: 150.0,
            breakdown_fee: 75.0,
            lumper_fee: 120.0,
            ..scenario_a()
        };
        let n = negotiate(&input, &PolicyDefaults::default(), &unavailable()).unwrap();
        let b = n.breakdown;
        assert_eq!(b.driver_detention_pay, 75.0);
        assert_eq!(b.driver_layover_pay, 300.0);
        assert_eq!(b.driver_breakdown_pay, 75.0);
        assert_eq!(b.carrier_accessorials, 120.0);
        assert!(approx(b.driver_total, 1015.75 + 75.0 + 300.0 + 75.0));
    }

    #[test]
    fn load_update_uses_driver_total_and_fuel_total() {
        let input = NegotiationInput {
            apply_to_load: true,
            ..scenario_a()
        };
        let n = negotiate(&input, &PolicyDefaults::default(), &priced(4.00)).unwrap();
        assert!(n.apply_to_load);
        let update = n.load_update();
        assert_eq!(update.driver_pay, 1015.75);
        assert_eq!(update.fuel_surcharge, 147.08);
    }

    #[test]
    fn zero_margins_yield_zero_profit() {
        let policy = PolicyDefaults {
            broker_margin_pct: 0.0,
            ..PolicyDefaults::default()
        };
        let n = negotiate(&scenario_a(), &policy, &unavailable()).unwrap();
        assert_eq!(n.breakdown.broker_profit, 0.0);
        assert_eq!(n.breakdown.broker_margin_pct_real, 0.0);
    }

    #[test]
    fn zero_cost_policy_guards_margin_division() {
        let policy = PolicyDefaults {
            driver_loaded_mile_pay: 0.0,
            carrier_cost_per_total_mile: 0.0,
            ..PolicyDefaults::default()
        };
        let n = negotiate(&scenario_a(), &policy, &unavailable()).unwrap();
        assert_eq!(n.breakdown.customer_rate_total, 0.0);
        assert_eq!(n.breakdown.broker_margin_pct_real, 0.0);
        assert_eq!(n.breakdown.linehaul_display, 0.0);
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let input: NegotiationInput = serde_json::from_value(serde_json::json!({
            "loaded_miles": 239,
            "total_miles": 260,
            "fuel_mode": "origin_state",
            "origin_state": " tx "
        }))
        .unwrap();
        assert_eq!(input.fuel_mode, FuelMode::OriginState);
        assert_eq!(input.normalized_origin_state().as_deref(), Some("TX"));
        assert_eq!(input.lumper_fee, 0.0);
        assert!(!input.apply_to_load);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::fuel::SeriesSelection;
    use proptest::prelude::*;

    fn fuel_strategy() -> impl Strategy<Value = FuelQuote> {
        prop_oneof![
            Just(FuelQuote::unavailable(
                SeriesSelection::national(FuelMode::National, None, false),
                6.5,
                "No data rows returned",
            )),
            (1.0f64..8.0).prop_map(|price| FuelQuote::priced(
                SeriesSelection::national(FuelMode::National, None, false),
                price,
                None,
                6.5,
            )),
        ]
    }

    fn input_strategy() -> impl Strategy<Value = NegotiationInput> {
        (
            1.0f64..3000.0,
            0.0f64..500.0,
            0.0f64..400.0,
            0.0f64..12.0,
            0.0f64..300.0,
            0u32..4,
            0.0f64..250.0,
        )
            .prop_map(
                |(loaded, deadhead, lumper, detention, breakdown, days, per_day)| NegotiationInput {
                    loaded_miles: loaded,
                    total_miles: loaded + deadhead,
                    lumper_fee: lumper,
                    detention_hours: detention,
                    breakdown_fee: breakdown,
                    layover_days: f64::from(days),
                    layover_per_day: per_day,
                    ..NegotiationInput::default()
                },
            )
    }

    proptest! {
        /// Total below loaded is always rejected, whatever else is supplied.
        #[test]
        fn total_below_loaded_is_bad_input(loaded in 1.0f64..5000.0, short in 0.01f64..0.99, fuel in fuel_strategy()) {
            let input = NegotiationInput {
                loaded_miles: loaded,
                total_miles: loaded * short,
                ..NegotiationInput::default()
            };
            prop_assert_eq!(
                negotiate(&input, &PolicyDefaults::default(), &fuel).unwrap_err(),
                NegotiationError::TotalBelowLoaded
            );
        }

        /// Same input, policy and fuel give the same breakdown bit for bit.
        #[test]
        fn negotiation_is_deterministic(input in input_strategy(), fuel in fuel_strategy()) {
            let policy = PolicyDefaults::default();
            let a = negotiate(&input, &policy, &fuel).unwrap();
            let b = negotiate(&input, &policy, &fuel).unwrap();
            prop_assert_eq!(
                serde_json::to_vec(&a).unwrap(),
                serde_json::to_vec(&b).unwrap()
            );
        }

        /// Raising the requested CPM raises every downstream money figure.
        #[test]
        fn higher_cpm_raises_the_rate_stack(
            input in input_strategy(),
            fuel in fuel_strategy(),
            cpm in 0.5f64..8.0,
            bump in 0.01f64..2.0,
        ) {
            let policy = PolicyDefaults::default();
            let low = negotiate(
                &NegotiationInput { driver_loaded_mile_pay: Some(cpm), ..input.clone() },
                &policy,
                &fuel,
            ).unwrap().breakdown;
            let high = negotiate(
                &NegotiationInput { driver_loaded_mile_pay: Some(cpm + bump), ..input },
                &policy,
                &fuel,
            ).unwrap().breakdown;
            prop_assert!(high.driver_total > low.driver_total);
            prop_assert!(high.carrier_cost_subtotal > low.carrier_cost_subtotal);
            prop_assert!(high.carrier_revenue > low.carrier_revenue);
            prop_assert!(high.dispatch_fee > low.dispatch_fee);
            prop_assert!(high.broker_cost > low.broker_cost);
            prop_assert!(high.customer_rate_total > low.customer_rate_total);
        }

        /// With no fuel price the calculation still succeeds and fuel is zero.
        #[test]
        fn unavailable_fuel_is_zero_and_never_fails(input in input_strategy()) {
            let fuel = FuelQuote::unavailable(
                SeriesSelection::national(FuelMode::National, None, false),
                6.5,
                "HTTP 503: upstream",
            );
            let n = negotiate(&input, &PolicyDefaults::default(), &fuel).unwrap();
            prop_assert_eq!(n.breakdown.fuel_total, 0.0);
            prop_assert!(n.breakdown.linehaul_display >= 0.0);
        }
    }
}
