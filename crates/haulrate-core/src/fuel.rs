//! # Fuel Quote
//!
//! The result of fuel cost resolution and the arithmetic that turns a diesel
//! price into a per-mile and per-trip fuel cost.
//!
//! A [`FuelQuote`] is computed fresh for each negotiation and never stored on
//! its own. When no price could be obtained the quote is
//! [`FuelSource::Unavailable`] with a zero per-mile cost, and the negotiation
//! proceeds without fuel.

use serde::{Deserialize, Serialize};

use crate::money::round_to;

/// Miles per gallon used when none is configured.
pub const DEFAULT_MPG: f64 = 6.5;

/// Weekly U.S. No. 2 diesel retail price series (dollars per gallon).
pub const NATIONAL_DIESEL_SERIES: &str = "EMD_EPD2D_PTE_NUS_DPG";

/// How the diesel price series is chosen.
///
/// Parsing is lenient: anything other than `origin_state` means national.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum FuelMode {
    /// Always use the national series.
    #[default]
    National,
    /// Use the origin state's series when one is mapped.
    OriginState,
}

impl FuelMode {
    /// Parse a mode string, case-insensitively.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("origin_state") {
            Self::OriginState
        } else {
            Self::National
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::OriginState => "origin_state",
        }
    }
}

impl From<String> for FuelMode {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl std::fmt::Display for FuelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the diesel price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelSource {
    /// The national series.
    National,
    /// A state-level series.
    State,
    /// No price could be obtained.
    Unavailable,
}

/// Normalize a caller-supplied state code: trimmed, uppercased, blank is none.
pub fn normalize_state(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_uppercase)
}

/// The series chosen for a quote, decided before any price is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSelection {
    /// Series identifier sent to the price feed.
    pub series_id: String,
    /// Requested mode.
    pub mode: FuelMode,
    /// Normalized origin state, if given.
    pub origin_state: Option<String>,
    /// True when a state series was requested but none was mapped.
    pub series_fallback: bool,
    /// Source the quote will report if the fetch succeeds.
    pub source: FuelSource,
}

impl SeriesSelection {
    /// The national series for the given request.
    pub fn national(mode: FuelMode, origin_state: Option<String>, series_fallback: bool) -> Self {
        Self {
            series_id: NATIONAL_DIESEL_SERIES.to_string(),
            mode,
            origin_state,
            series_fallback,
            source: FuelSource::National,
        }
    }

    /// A mapped state series.
    pub fn state(series_id: impl Into<String>, origin_state: String) -> Self {
        Self {
            series_id: series_id.into(),
            mode: FuelMode::OriginState,
            origin_state: Some(origin_state),
            series_fallback: false,
            source: FuelSource::State,
        }
    }
}

/// A resolved fuel cost.
///
/// Invariant: `source == Unavailable` implies `diesel_price == None` and
/// `per_mile_cost == 0.0`. The constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelQuote {
    /// Latest weekly diesel price in dollars per gallon.
    pub diesel_price: Option<f64>,
    /// `diesel_price / mpg_used`, full precision.
    pub per_mile_cost: f64,
    /// Fuel economy used for the conversion.
    pub mpg_used: f64,
    /// Where the price came from.
    pub source: FuelSource,
    /// Reporting period of the price (e.g. `2026-10-12`).
    pub period: Option<String>,
    /// Series that was (or would have been) queried.
    pub series_id: String,
    /// Requested mode.
    pub mode: FuelMode,
    /// Normalized origin state, if given.
    pub origin_state: Option<String>,
    /// True when the state series was unmapped and national was used.
    pub series_fallback: bool,
    /// Human-readable reason when the price is unavailable.
    pub diagnostic: Option<String>,
    /// Provider-specific metadata (masked request URL, HTTP status, attempts).
    pub provenance: serde_json::Value,
}

impl FuelQuote {
    /// A quote backed by an observed diesel price.
    ///
    /// A non-finite or non-positive price is treated as unavailable.
    pub fn priced(selection: SeriesSelection, diesel_price: f64, period: Option<String>, mpg: f64) -> Self {
        if !diesel_price.is_finite() || diesel_price <= 0.0 {
            return Self::unavailable(selection, mpg, format!("Bad value: {diesel_price}"));
        }
        let mpg = effective_mpg(mpg);
        Self {
            diesel_price: Some(diesel_price),
            per_mile_cost: diesel_price / mpg,
            mpg_used: mpg,
            source: selection.source,
            period,
            series_id: selection.series_id,
            mode: selection.mode,
            origin_state: selection.origin_state,
            series_fallback: selection.series_fallback,
            diagnostic: None,
            provenance: serde_json::Value::Null,
        }
    }

    /// A quote with no price. Fuel cost is zero.
    pub fn unavailable(selection: SeriesSelection, mpg: f64, diagnostic: impl Into<String>) -> Self {
        Self {
            diesel_price: None,
            per_mile_cost: 0.0,
            mpg_used: effective_mpg(mpg),
            source: FuelSource::Unavailable,
            period: None,
            series_id: selection.series_id,
            mode: selection.mode,
            origin_state: selection.origin_state,
            series_fallback: selection.series_fallback,
            diagnostic: Some(diagnostic.into()),
            provenance: serde_json::Value::Null,
        }
    }

    /// Attach provider metadata.
    pub fn with_provenance(mut self, provenance: serde_json::Value) -> Self {
        self.provenance = provenance;
        self
    }

    /// Whether a price was obtained.
    pub fn is_available(&self) -> bool {
        self.source != FuelSource::Unavailable
    }

    /// Fuel cost for a trip. Charged on loaded miles only; deadhead fuel is
    /// carried by the carrier's per-total-mile operating cost.
    pub fn fuel_total(&self, loaded_miles: f64) -> f64 {
        self.per_mile_cost * loaded_miles
    }

    /// The fuel section of a negotiation report.
    pub fn report(&self, loaded_miles: f64) -> serde_json::Value {
        serde_json::json!({
            "ok": self.is_available(),
            "source": self.source,
            "diesel_price": self.diesel_price,
            "period": self.period,
            "series_id": self.series_id,
            "mode": self.mode,
            "origin_state": self.origin_state,
            "series_fallback": self.series_fallback,
            "mpg": self.mpg_used,
            "fuel_per_mile": round_to(self.per_mile_cost, 5),
            "fuel_total": round_to(self.fuel_total(loaded_miles), 2),
            "diagnostic": self.diagnostic,
            "meta": self.provenance,
        })
    }
}

/// The configured MPG, or [`DEFAULT_MPG`] when it is not a positive number.
pub fn effective_mpg(mpg: f64) -> f64 {
    if mpg.is_finite() && mpg > 0.0 {
        mpg
    } else {
        DEFAULT_MPG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn national() -> SeriesSelection {
        SeriesSelection::national(FuelMode::National, None, false)
    }

    #[test]
    fn mode_parsing_is_lenient() {
        assert_eq!(FuelMode::parse_lenient("origin_state"), FuelMode::OriginState);
        assert_eq!(FuelMode::parse_lenient(" ORIGIN_STATE "), FuelMode::OriginState);
        assert_eq!(FuelMode::parse_lenient("national"), FuelMode::National);
        assert_eq!(FuelMode::parse_lenient("regional"), FuelMode::National);
        assert_eq!(FuelMode::parse_lenient(""), FuelMode::National);
        let m: FuelMode = serde_json::from_str("\"Origin_State\"").unwrap();
        assert_eq!(m, FuelMode::OriginState);
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"origin_state\"");
    }

    #[test]
    fn state_normalization() {
        assert_eq!(normalize_state(Some(" tx ")), Some("TX".to_string()));
        assert_eq!(normalize_state(Some("  ")), None);
        assert_eq!(normalize_state(None), None);
    }

    #[test]
    fn priced_quote_divides_by_mpg() {
        let q = FuelQuote::priced(national(), 4.00, Some("2026-10-12".into()), 6.5);
        assert!((q.per_mile_cost - 0.615_384_615).abs() < 1e-9);
        assert_eq!(q.source, FuelSource::National);
        assert!(q.is_available());
        assert_eq!(round_to(q.fuel_total(239.0), 2), 147.08);
    }

    #[test]
    fn unavailable_quote_costs_nothing() {
        let q = FuelQuote::unavailable(national(), 6.5, "Missing EIA_API_KEY");
        assert_eq!(q.per_mile_cost, 0.0);
        assert_eq!(q.diesel_price, None);
        assert_eq!(q.fuel_total(1000.0), 0.0);
        assert_eq!(q.diagnostic.as_deref(), Some("Missing EIA_API_KEY"));
    }

    #[test]
    fn bad_price_degrades_to_unavailable() {
        let q = FuelQuote::priced(national(), f64::NAN, None, 6.5);
        assert_eq!(q.source, FuelSource::Unavailable);
        assert_eq!(q.per_mile_cost, 0.0);
        let q = FuelQuote::priced(national(), 0.0, None, 6.5);
        assert_eq!(q.source, FuelSource::Unavailable);
    }

    #[test]
    fn non_positive_mpg_uses_default() {
        assert_eq!(effective_mpg(0.0), DEFAULT_MPG);
        assert_eq!(effective_mpg(-3.0), DEFAULT_MPG);
        assert_eq!(effective_mpg(7.2), 7.2);
        let q = FuelQuote::priced(national(), 6.5, None, 0.0);
        assert_eq!(q.per_mile_cost, 1.0);
    }

    #[test]
    fn report_rounds_at_the_boundary() {
        let q = FuelQuote::priced(national(), 4.00, None, 6.5);
        let r = q.report(239.0);
        assert_eq!(r["ok"], true);
        assert_eq!(r["source"], "NATIONAL");
        assert_eq!(r["fuel_per_mile"], 0.61538);
        assert_eq!(r["fuel_total"], 147.08);
    }
}
