//! # Error Hierarchy
//!
//! Structured error types for the negotiation core, built with `thiserror`.
//! Every error here is a caller mistake or a configuration mistake; upstream
//! provider failures never surface as errors from this crate.

use thiserror::Error;

/// Validation errors for domain primitives and policy values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Postal code has fewer than five digits after stripping non-digits.
    #[error("Bad ZIP: \"{0}\" (expected at least 5 digits)")]
    InvalidPostalCode(String),

    /// Country code is not a two-letter ISO 3166-1 alpha-2 code.
    #[error("invalid country code: \"{0}\" (expected 2 letters)")]
    InvalidCountryCode(String),

    /// A policy value is out of its permitted range.
    #[error("invalid policy value for {field}: {value} ({reason})")]
    InvalidPolicy {
        /// Name of the offending policy field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Rejections raised by the negotiation calculator before any computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NegotiationError {
    /// Either mileage figure is zero or negative.
    #[error("loaded_miles and total_miles must be > 0")]
    NonPositiveMiles,

    /// Total miles are less than loaded miles.
    #[error("total_miles cannot be < loaded_miles")]
    TotalBelowLoaded,

    /// A numeric input is NaN, infinite, or negative.
    #[error("{field} must be a finite number >= 0")]
    InvalidAmount {
        /// Name of the offending input field.
        field: &'static str,
    },
}

/// Errors while assembling runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    PolicyFileRead {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The policy file is not valid YAML for [`crate::PolicyDefaults`].
    #[error("failed to parse policy file {path}: {source}")]
    PolicyFileParse {
        /// Path that was attempted.
        path: String,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// The loaded policy failed validation.
    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] ValidationError),
}
