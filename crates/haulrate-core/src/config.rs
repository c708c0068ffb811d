//! # Negotiation Configuration
//!
//! Policy defaults, fuel economy and deadhead buffer, loaded once at startup
//! and passed explicitly into the calculator and mileage estimator.
//!
//! ## Environment
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `HAULRATE_POLICY_FILE` | YAML file overlaying [`PolicyDefaults`] | built-in policy |
//! | `DEFAULT_MPG` | Fuel economy for per-mile fuel cost | `6.5` (also when `<= 0`) |
//! | `DEADHEAD_BUFFER_PCT` | Fraction (`0.07`) or percent (`7`) | `0.07`, clamped to `0..=0.30` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fuel::{effective_mpg, DEFAULT_MPG};
use crate::mileage::{clamp_buffer, parse_deadhead_buffer, DEFAULT_DEADHEAD_BUFFER_PCT};
use crate::policy::PolicyDefaults;

/// Immutable configuration for negotiation and mileage estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    pub policy: PolicyDefaults,
    pub mpg: f64,
    pub deadhead_buffer_pct: f64,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyDefaults::default(),
            mpg: DEFAULT_MPG,
            deadhead_buffer_pct: DEFAULT_DEADHEAD_BUFFER_PCT,
        }
    }
}

impl NegotiationConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let policy = match lookup("HAULRATE_POLICY_FILE").filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let policy = PolicyDefaults::from_yaml_file(Path::new(path.trim()))?;
                tracing::info!(path = %path.trim(), "loaded negotiation policy file");
                policy
            }
            None => PolicyDefaults::default(),
        };

        let mpg = lookup("DEFAULT_MPG")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(effective_mpg)
            .unwrap_or(DEFAULT_MPG);

        let deadhead_buffer_pct = parse_deadhead_buffer(lookup("DEADHEAD_BUFFER_PCT").as_deref());

        Ok(Self {
            policy,
            mpg,
            deadhead_buffer_pct,
        })
    }

    /// Replace the policy, validating it.
    pub fn with_policy(mut self, policy: PolicyDefaults) -> Result<Self, ConfigError> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Replace the fuel economy. Non-positive values fall back to the default.
    pub fn with_mpg(mut self, mpg: f64) -> Self {
        self.mpg = effective_mpg(mpg);
        self
    }

    /// Replace the deadhead buffer, clamped to the accepted range.
    pub fn with_deadhead_buffer(mut self, buffer_pct: f64) -> Self {
        self.deadhead_buffer_pct = clamp_buffer(buffer_pct);
        self
    }
}
