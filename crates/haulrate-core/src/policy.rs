//! # Policy Defaults
//!
//! The read-only negotiation policy: default driver pay, detention rate,
//! carrier operating cost, the three margin percentages, and the CPM level
//! above which a driver-pay override should carry a reason.
//!
//! A policy is immutable for the duration of a calculation. It is loaded once
//! (built-in defaults, optionally overlaid by a YAML file) and passed into the
//! calculator explicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};

/// Negotiation policy values.
///
/// Missing fields in a policy file fall back to [`PolicyDefaults::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyDefaults {
    /// Default driver pay per loaded mile (CPM).
    pub driver_loaded_mile_pay: f64,
    /// Driver detention pay per hour. Always applied; callers cannot override it.
    pub detention_per_hour: f64,
    /// Carrier operating cost per total (loaded + deadhead) mile.
    pub carrier_cost_per_total_mile: f64,
    /// Carrier margin applied on top of the carrier cost subtotal.
    pub carrier_margin_pct: f64,
    /// Broker margin applied on top of broker cost.
    pub broker_margin_pct: f64,
    /// Dispatch fee as a fraction of carrier revenue.
    pub dispatch_pct: f64,
    /// Requested CPM above which an override reason is expected.
    pub driver_reason_threshold: f64,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            driver_loaded_mile_pay: 4.25,
            detention_per_hour: 25.0,
            carrier_cost_per_total_mile: 0.60,
            carrier_margin_pct: 0.06,
            broker_margin_pct: 0.10,
            dispatch_pct: 0.08,
            driver_reason_threshold: 5.00,
        }
    }
}

impl PolicyDefaults {
    /// Check every value is finite and non-negative, and that percentages
    /// lie within `0..=1`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let amounts = [
            ("driver_loaded_mile_pay", self.driver_loaded_mile_pay),
            ("detention_per_hour", self.detention_per_hour),
            ("carrier_cost_per_total_mile", self.carrier_cost_per_total_mile),
            ("driver_reason_threshold", self.driver_reason_threshold),
        ];
        for (field, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidPolicy {
                    field,
                    value,
                    reason: "must be a finite number >= 0",
                });
            }
        }

        let percentages = [
            ("carrier_margin_pct", self.carrier_margin_pct),
            ("broker_margin_pct", self.broker_margin_pct),
            ("dispatch_pct", self.dispatch_pct),
        ];
        for (field, value) in percentages {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidPolicy {
                    field,
                    value,
                    reason: "must be within 0..=1",
                });
            }
        }
        Ok(())
    }

    /// Parse and validate a policy from YAML text.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let policy: PolicyDefaults =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::PolicyFileParse {
                path: origin.to_string(),
                source,
            })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a policy from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyFileRead {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml_str(&yaml, &display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_published_policy() {
        let p = PolicyDefaults::default();
        assert_eq!(p.driver_loaded_mile_pay, 4.25);
        assert_eq!(p.detention_per_hour, 25.0);
        assert_eq!(p.carrier_cost_per_total_mile, 0.60);
        assert_eq!(p.carrier_margin_pct, 0.06);
        assert_eq!(p.broker_margin_pct, 0.10);
        assert_eq!(p.dispatch_pct, 0.08);
        assert_eq!(p.driver_reason_threshold, 5.00);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn partial_yaml_overlays_defaults() {
        let p = PolicyDefaults::from_yaml_str("driver_loaded_mile_pay: 3.9\ndispatch_pct: 0.05\n", "inline")
            .unwrap();
        assert_eq!(p.driver_loaded_mile_pay, 3.9);
        assert_eq!(p.dispatch_pct, 0.05);
        assert_eq!(p.detention_per_hour, 25.0);
    }

    #[test]
    fn unknown_yaml_field_is_rejected() {
        let err = PolicyDefaults::from_yaml_str("driver_cpm: 3.9\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::PolicyFileParse { .. }));
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let err = PolicyDefaults::from_yaml_str("broker_margin_pct: 10\n", "inline").unwrap_err();
        match err {
            ConfigError::InvalidPolicy(ValidationError::InvalidPolicy { field, .. }) => {
                assert_eq!(field, "broker_margin_pct");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_amount_is_rejected() {
        let p = PolicyDefaults {
            detention_per_hour: -1.0,
            ..PolicyDefaults::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn loads_policy_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "carrier_cost_per_total_mile: 0.72").unwrap();
        let p = PolicyDefaults::from_yaml_file(file.path()).unwrap();
        assert_eq!(p.carrier_cost_per_total_mile, 0.72);
    }

    #[test]
    fn missing_policy_file_reports_path() {
        let err = PolicyDefaults::from_yaml_file(Path::new("/nonexistent/haulrate-policy.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/haulrate-policy.yaml"));
    }
}
