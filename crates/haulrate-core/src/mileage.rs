//! Loaded/total mileage from a routed distance.

use serde::{Deserialize, Serialize};

use crate::money::{cents, round_to};

/// Deadhead buffer used when none is configured.
pub const DEFAULT_DEADHEAD_BUFFER_PCT: f64 = 0.07;

/// Largest deadhead buffer accepted.
pub const MAX_DEADHEAD_BUFFER_PCT: f64 = 0.30;

/// Mileage derived from a routed distance plus a deadhead buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MileageEstimate {
    pub loaded_miles: f64,
    pub total_miles: f64,
    pub deadhead_buffer_pct: f64,
}

impl MileageEstimate {
    /// `loaded = routed` and `total = loaded × (1 + buffer)`, both in cents
    /// precision. The buffer is clamped to `0..=0.30`.
    pub fn from_routed_miles(routed_miles: f64, buffer_pct: f64) -> Self {
        let buffer = clamp_buffer(buffer_pct);
        let loaded_miles = cents(routed_miles);
        Self {
            loaded_miles,
            total_miles: cents(loaded_miles * (1.0 + buffer)),
            deadhead_buffer_pct: round_to(buffer, 4),
        }
    }
}

/// Clamp a buffer fraction into the accepted range. NaN becomes the default.
pub fn clamp_buffer(buffer_pct: f64) -> f64 {
    if buffer_pct.is_nan() {
        return DEFAULT_DEADHEAD_BUFFER_PCT;
    }
    buffer_pct.clamp(0.0, MAX_DEADHEAD_BUFFER_PCT)
}

/// Parse a configured buffer: a fraction (`0.07`) or a percentage (`7`).
/// Unparseable input yields the default.
pub fn parse_deadhead_buffer(raw: Option<&str>) -> f64 {
    let Some(parsed) = raw.and_then(|s| s.trim().parse::<f64>().ok()) else {
        return DEFAULT_DEADHEAD_BUFFER_PCT;
    };
    if !parsed.is_finite() {
        return DEFAULT_DEADHEAD_BUFFER_PCT;
    }
    let fraction = if parsed > 1.0 { parsed / 100.0 } else { parsed };
    clamp_buffer(fraction)
}
