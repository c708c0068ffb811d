//! Output-boundary rounding.
//!
//! All arithmetic in the calculator runs at full `f64` precision. These
//! helpers are applied only when a value leaves the core (report payloads,
//! load write-back).

/// Round `value` to `places` decimal places, half away from zero.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Normalize -0.0 so serialized output never shows a signed zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round a dollar amount to cents.
pub fn cents(value: f64) -> f64 {
    round_to(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_rounds_to_two_places() {
        assert_eq!(cents(12.3456), 12.35);
        assert_eq!(cents(-12.3456), -12.35);
        assert_eq!(cents(147.076923), 147.08);
        assert_eq!(cents(0.004), 0.0);
    }

    #[test]
    fn round_to_normalizes_negative_zero() {
        let v = round_to(-0.00001, 2);
        assert_eq!(v, 0.0);
        assert!(v.is_sign_positive());
    }

    #[test]
    fn round_to_supports_other_precisions() {
        assert_eq!(round_to(0.615_384_6, 5), 0.61538);
        assert_eq!(round_to(0.090_909_09, 4), 0.0909);
    }
}
