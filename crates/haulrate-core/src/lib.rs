//! # haulrate-core: Rate Negotiation Domain
//!
//! The pure part of haulrate. No network, no clock, no environment reads
//! outside [`NegotiationConfig::from_env`]. Depends only on `serde`,
//! `serde_json`, `serde_yaml`, `thiserror` and `tracing`.
//!
//! ## Contents
//!
//! - [`PolicyDefaults`]: the read-only negotiation policy.
//! - [`NegotiationConfig`]: policy plus fuel economy and deadhead buffer,
//!   built once and passed explicitly.
//! - [`FuelQuote`]: a resolved diesel price and the per-mile fuel cost it
//!   implies. Unavailable quotes cost zero.
//! - [`negotiate`]: the driver → carrier → dispatch → broker → customer rate
//!   stack.
//! - [`NegotiationReport`]: the rounded response payload.
//! - [`PostalCode`] / [`CountryCode`]: normalized keys for geocoding and
//!   routing.
//! - [`MileageEstimate`]: loaded and total miles from a routed distance.
//!
//! Money is computed at full precision and rounded to cents only at output.

pub mod config;
pub mod error;
pub mod fuel;
pub mod mileage;
pub mod money;
pub mod negotiation;
pub mod policy;
pub mod postal;
pub mod report;

pub use config::NegotiationConfig;
pub use error::{ConfigError, NegotiationError, ValidationError};
pub use fuel::{FuelMode, FuelQuote, FuelSource, SeriesSelection, NATIONAL_DIESEL_SERIES};
pub use mileage::MileageEstimate;
pub use negotiation::{negotiate, LoadRateUpdate, Negotiation, NegotiationInput, RateBreakdown};
pub use policy::PolicyDefaults;
pub use postal::{extract_postal_code, CountryCode, PostalCode};
pub use report::NegotiationReport;
